//! Transition rules, free of I/O.
//!
//! Each rule looks at where an item currently is and who is asking, and says
//! whether to write, to do nothing, or to refuse.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::item::{Claim, Completion, Item, Status};
use crate::model::user::Identity;
use crate::store::Located;

/// Outcome of a rule that allows idempotent repeats.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Perform the write.
    Apply(T),
    /// Already in the requested state. Succeed without writing or notifying.
    Noop,
}

fn transition(from: Status, to: Status) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition { from, to })
    }
}

/// Claim an item for `actor`.
pub fn claim(found: &Located, actor: &Identity, now: DateTime<Utc>) -> Result<Step<Claim>> {
    let item = match found {
        Located::History(item) => {
            return Err(Error::InvalidTransition {
                from: item.status,
                to: Status::InProgress,
            });
        }
        Located::Active(item) => item,
    };
    match item.claimant() {
        Some(holder) if holder == actor.username => Ok(Step::Noop),
        Some(holder) => Err(Error::AlreadyClaimed {
            id: item.id,
            by: holder.to_string(),
        }),
        None => {
            transition(item.status, Status::InProgress)?;
            Ok(Step::Apply(Claim {
                by: actor.username.clone(),
                at: now,
            }))
        }
    }
}

/// Release a claim. The claimant and privileged users may do this.
pub fn unclaim(found: &Located, actor: &Identity) -> Result<Step<()>> {
    let item = match found {
        Located::History(item) => {
            return Err(Error::InvalidTransition {
                from: item.status,
                to: Status::Queued,
            });
        }
        Located::Active(item) => item,
    };
    let Some(holder) = item.claimant() else {
        return Ok(Step::Noop);
    };
    if holder != actor.username && !actor.role.is_privileged() {
        return Err(Error::Forbidden(format!(
            "item {} is claimed by {holder}",
            item.id
        )));
    }
    transition(item.status, Status::Queued)?;
    Ok(Step::Apply(()))
}

/// Build the completion record for an in-progress item.
pub fn complete(
    found: &Located,
    actor: &Identity,
    notes: &str,
    now: DateTime<Utc>,
) -> Result<Completion> {
    let item: &Item = found.item();
    transition(item.status, Status::Completed)?;
    Ok(Completion {
        by: actor.username.clone(),
        at: now,
        notes: notes.to_string(),
        claimed_at: item.claim.as_ref().map(|c| c.at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::NewItem;
    use crate::model::user::Role;

    fn who(name: &str, role: Role) -> Identity {
        Identity {
            username: name.to_string(),
            role,
        }
    }

    fn queued() -> Item {
        Item::queued(NewItem::new("a.png", "/uploads/a.png"), "up", Utc::now())
    }

    fn held_by(name: &str) -> Item {
        queued().with_claim(Some(Claim {
            by: name.to_string(),
            at: Utc::now(),
        }))
    }

    #[test]
    fn claim_by_holder_is_noop_and_by_other_is_rejected() {
        let found = Located::Active(held_by("alice"));
        let now = Utc::now();
        assert_eq!(
            claim(&found, &who("alice", Role::User), now).unwrap(),
            Step::Noop
        );
        let err = claim(&found, &who("bob", Role::Admin), now).unwrap_err();
        assert!(matches!(err, Error::AlreadyClaimed { by, .. } if by == "alice"));
    }

    #[test]
    fn unclaim_needs_holder_or_privilege() {
        let found = Located::Active(held_by("alice"));
        assert!(matches!(
            unclaim(&found, &who("bob", Role::User)),
            Err(Error::Forbidden(_))
        ));
        assert_eq!(
            unclaim(&found, &who("carol", Role::Trusted)).unwrap(),
            Step::Apply(())
        );
        assert_eq!(
            unclaim(&Located::Active(queued()), &who("bob", Role::User)).unwrap(),
            Step::Noop
        );
    }

    #[test]
    fn complete_requires_in_progress() {
        let actor = who("alice", Role::User);
        let err = complete(&Located::Active(queued()), &actor, "", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: Status::Queued,
                to: Status::Completed
            }
        ));

        let done = complete(&Located::Active(held_by("bob")), &actor, "ok", Utc::now()).unwrap();
        assert_eq!(done.by, "alice");
        assert!(done.claimed_at.is_some());
    }

    #[test]
    fn history_items_refuse_every_transition() {
        let actor = who("alice", Role::Admin);
        let item = held_by("alice").into_completed(Completion {
            by: "alice".to_string(),
            at: Utc::now(),
            notes: String::new(),
            claimed_at: None,
        });
        let found = Located::History(item);
        assert!(claim(&found, &actor, Utc::now()).is_err());
        assert!(unclaim(&found, &actor).is_err());
        assert!(complete(&found, &actor, "", Utc::now()).is_err());
    }
}

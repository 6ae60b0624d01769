//! Composable access rules for the API layer.
//!
//! Handlers build a [`Predicate`] describing who may perform an action and
//! evaluate it against an [`AccessContext`] derived from the authenticated
//! caller and the targeted resource.

/// Facts about the caller relative to one resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessContext {
    pub authenticated: bool,
    pub is_moderator: bool,
    pub is_owner: bool,
}

/// Boolean combinator over access facts.
#[derive(Debug, Clone)]
pub enum Predicate {
    Authenticated,
    Moderator,
    Owner,
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn evaluate(&self, ctx: &AccessContext) -> bool {
        match self {
            Self::Authenticated => ctx.authenticated,
            Self::Moderator => ctx.is_moderator,
            Self::Owner => ctx.is_owner,
            Self::Not(inner) => !inner.evaluate(ctx),
            Self::And(left, right) => left.evaluate(ctx) && right.evaluate(ctx),
            Self::Or(left, right) => left.evaluate(ctx) || right.evaluate(ctx),
        }
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Read or update a course/lesson: moderators or the owner.
#[must_use]
pub fn can_view_or_edit() -> Predicate {
    Predicate::Authenticated.and(Predicate::Moderator.or(Predicate::Owner))
}

/// Create a course/lesson: any authenticated non-moderator.
#[must_use]
pub fn can_create() -> Predicate {
    Predicate::Authenticated.and(Predicate::Moderator.negate())
}

/// Delete a course/lesson: the owner only.
#[must_use]
pub fn can_delete() -> Predicate {
    Predicate::Authenticated.and(Predicate::Owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(authenticated: bool, is_moderator: bool, is_owner: bool) -> AccessContext {
        AccessContext {
            authenticated,
            is_moderator,
            is_owner,
        }
    }

    #[test]
    fn test_view_allows_moderator_and_owner() {
        let rule = can_view_or_edit();
        assert!(rule.evaluate(&ctx(true, true, false)));
        assert!(rule.evaluate(&ctx(true, false, true)));
        assert!(!rule.evaluate(&ctx(true, false, false)));
        assert!(!rule.evaluate(&ctx(false, true, true)));
    }

    #[test]
    fn test_create_excludes_moderators() {
        let rule = can_create();
        assert!(rule.evaluate(&ctx(true, false, false)));
        assert!(!rule.evaluate(&ctx(true, true, false)));
        assert!(!rule.evaluate(&ctx(false, false, false)));
    }

    #[test]
    fn test_delete_is_owner_only() {
        let rule = can_delete();
        assert!(rule.evaluate(&ctx(true, false, true)));
        assert!(!rule.evaluate(&ctx(true, true, false)));
        assert!(!rule.evaluate(&ctx(true, false, false)));
        assert!(!rule.evaluate(&ctx(false, false, true)));
    }

    #[test]
    fn test_delete_survives_moderator_promotion() {
        // Moderator status does not revoke an owner's delete right.
        assert!(can_delete().evaluate(&ctx(true, true, true)));
    }

    #[test]
    fn test_combinators_compose() {
        let rule = Predicate::Moderator.or(Predicate::Owner).negate();
        assert!(rule.evaluate(&ctx(true, false, false)));
        assert!(!rule.evaluate(&ctx(true, true, false)));
    }
}

//! Attribute based access control.
//!
//! A request is described by a [`Subject`] (the caller's attributes), a
//! resource path and an abstract [`Action`]. The engine walks an ordered
//! rule table and the first rule matching all three decides; when no rule
//! matches the request is denied. Evaluation is pure and lock free.
//!
//! Resource paths are route templates with their parameter segments
//! removed, so `/users/admin/username/:username/` is checked as
//! `/users/admin/username/`. See [`normalize_resource`].

use axum::http::Method;

use crate::models::User;
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: &'static [Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];

    /// `None` for methods that carry no action (OPTIONS, HEAD, ...).
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Action::Read),
            Method::POST => Some(Action::Create),
            Method::PUT | Method::PATCH => Some(Action::Update),
            Method::DELETE => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// Which subjects a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectMatch {
    Any,
    Admin,
    Disabled,
}

impl SubjectMatch {
    fn matches(&self, subject: &Subject) -> bool {
        match self {
            SubjectMatch::Any => true,
            SubjectMatch::Admin => subject.is_admin,
            SubjectMatch::Disabled => subject.disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMatch {
    Any,
    /// Path prefix ending in `/`, matched on whole segments.
    Prefix(&'static str),
}

impl ResourceMatch {
    fn matches(&self, resource: &str) -> bool {
        match self {
            ResourceMatch::Any => true,
            ResourceMatch::Prefix(prefix) => resource.starts_with(prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub effect: Effect,
    pub subject: SubjectMatch,
    pub resource: ResourceMatch,
    pub actions: &'static [Action],
}

impl Rule {
    fn matches(&self, subject: &Subject, resource: &str, action: Action) -> bool {
        self.subject.matches(subject)
            && self.resource.matches(resource)
            && self.actions.contains(&action)
    }
}

pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "deny-disabled",
        effect: Effect::Deny,
        subject: SubjectMatch::Disabled,
        resource: ResourceMatch::Any,
        actions: Action::ALL,
    },
    Rule {
        name: "self-service",
        effect: Effect::Allow,
        subject: SubjectMatch::Any,
        resource: ResourceMatch::Prefix("/users/me/"),
        actions: Action::ALL,
    },
    Rule {
        name: "admin-directory",
        effect: Effect::Allow,
        subject: SubjectMatch::Admin,
        resource: ResourceMatch::Prefix("/users/admin/"),
        actions: &[Action::Read, Action::Update, Action::Delete],
    },
    Rule {
        name: "highlight-owner",
        effect: Effect::Allow,
        subject: SubjectMatch::Any,
        resource: ResourceMatch::Prefix("/highlights/"),
        actions: Action::ALL,
    },
];

/// Caller attributes seen by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub disabled: bool,
    authorized: bool,
}

impl Subject {
    pub fn new(id: i64, username: impl Into<String>, is_admin: bool, disabled: bool) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin,
            disabled,
            authorized: false,
        }
    }

    /// Set only by [`PolicyEngine::enforce`].
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }
}

impl From<&User> for Subject {
    fn from(user: &User) -> Self {
        Subject::new(user.id, user.username.clone(), user.is_admin, user.disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Rule that decided, `None` for the default deny.
    pub rule: Option<&'static str>,
}

impl Decision {
    pub fn rule_name(&self) -> &'static str {
        self.rule.unwrap_or("default-deny")
    }
}

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: Vec<Rule>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl PolicyEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, subject: &Subject, resource: &str, action: Action) -> Decision {
        if resource.split('/').any(|segment| segment == "..") {
            return Decision {
                allowed: false,
                rule: None,
            };
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(subject, resource, action))
            .map(|rule| Decision {
                allowed: rule.effect == Effect::Allow,
                rule: Some(rule.name),
            })
            .unwrap_or(Decision {
                allowed: false,
                rule: None,
            })
    }

    pub fn authorize(&self, subject: &Subject, resource: &str, action: Action) -> bool {
        self.evaluate(subject, resource, action).allowed
    }

    /// Evaluate and, on allow, hand back the subject marked as authorized.
    pub fn enforce(
        &self,
        mut subject: Subject,
        resource: &str,
        action: Action,
    ) -> Result<(Subject, Decision), (ServiceError, Decision)> {
        let decision = self.evaluate(&subject, resource, action);
        if decision.allowed {
            subject.authorized = true;
            Ok((subject, decision))
        } else {
            Err((ServiceError::PolicyForbidden, decision))
        }
    }
}

/// Drop `:param` and `*wildcard` segments from a route template and make
/// sure the result starts and ends with `/`.
pub fn normalize_resource(template: &str) -> String {
    let segments: Vec<&str> = template
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with(':') && !s.starts_with('*'))
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

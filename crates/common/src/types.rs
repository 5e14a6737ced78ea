use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of a module slug or section key.
pub const MAX_IDENT_LEN: usize = 64;

/// Errors from identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier {0:?} is longer than {MAX_IDENT_LEN} characters")]
    TooLong(String),
    #[error("identifier {0:?} may only contain lowercase letters, digits and '-'")]
    InvalidChars(String),
    #[error("identifier {0:?} may not start or end with '-'")]
    DanglingHyphen(String),
}

fn check_ident(raw: &str) -> Result<(), IdentError> {
    if raw.is_empty() {
        return Err(IdentError::Empty);
    }
    if raw.len() > MAX_IDENT_LEN {
        return Err(IdentError::TooLong(raw.to_string()));
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(IdentError::InvalidChars(raw.to_string()));
    }
    if raw.starts_with('-') || raw.ends_with('-') {
        return Err(IdentError::DanglingHyphen(raw.to_string()));
    }
    Ok(())
}

macro_rules! ident_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and syntax-check an identifier.
            pub fn parse(raw: impl Into<String>) -> Result<Self, IdentError> {
                let raw = raw.into();
                check_ident(&raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

ident_newtype!(
    /// Slug of a content module (e.g. `acme`).
    ModuleSlug
);

ident_newtype!(
    /// Key of a section inside a module page (e.g. `end-vision`).
    SectionKey
);

/// Lifecycle state of a section row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Draft,
    Published,
}

impl SectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of mutation an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SaveDraft,
    Publish,
    Restore,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaveDraft => "save_draft",
            Self::Publish => "publish",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full key of a section row: `(module, section, status)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRef {
    pub module_slug: ModuleSlug,
    pub section_key: SectionKey,
    pub status: SectionStatus,
}

impl SectionRef {
    pub fn new(module_slug: ModuleSlug, section_key: SectionKey, status: SectionStatus) -> Self {
        Self {
            module_slug,
            section_key,
            status,
        }
    }

    /// The same module/section with a different lifecycle state.
    pub fn with_status(&self, status: SectionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.module_slug, self.section_key, self.status)
    }
}

/// Unique identifier for an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated textual form.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The editor performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_id_uniqueness() {
        let a = AuditId::new();
        let b = AuditId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn audit_id_parses_display_form() {
        let id = AuditId::new();
        assert_eq!(AuditId::parse(&id.to_string()), Some(id));
        assert_eq!(AuditId::parse("not-a-uuid"), None);
    }

    #[test]
    fn ident_accepts_slugs() {
        assert!(ModuleSlug::parse("acme").is_ok());
        assert!(SectionKey::parse("end-vision").is_ok());
        assert!(SectionKey::parse("q3-2024").is_ok());
    }

    #[test]
    fn ident_rejects_bad_syntax() {
        assert_eq!(ModuleSlug::parse(""), Err(IdentError::Empty));
        assert!(matches!(
            ModuleSlug::parse("Acme"),
            Err(IdentError::InvalidChars(_))
        ));
        assert!(matches!(
            SectionKey::parse("../etc"),
            Err(IdentError::InvalidChars(_))
        ));
        assert!(matches!(
            SectionKey::parse("-vision"),
            Err(IdentError::DanglingHyphen(_))
        ));
        assert!(matches!(
            SectionKey::parse("a".repeat(MAX_IDENT_LEN + 1)),
            Err(IdentError::TooLong(_))
        ));
    }

    #[test]
    fn ident_serde_is_validated() {
        let ok: ModuleSlug = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(ok.as_str(), "acme");
        assert!(serde_json::from_str::<ModuleSlug>("\"ACME\"").is_err());
    }

    #[test]
    fn enums_use_snake_case_tags() {
        assert_eq!(
            serde_json::to_string(&AuditAction::SaveDraft).unwrap(),
            "\"save_draft\""
        );
        assert_eq!(
            serde_json::to_string(&SectionStatus::Published).unwrap(),
            "\"published\""
        );
        assert_eq!(AuditAction::Restore.to_string(), "restore");
    }

    #[test]
    fn section_ref_with_status_keeps_identity() {
        let draft = SectionRef::new(
            ModuleSlug::parse("acme").unwrap(),
            SectionKey::parse("end-vision").unwrap(),
            SectionStatus::Draft,
        );
        let published = draft.with_status(SectionStatus::Published);
        assert_eq!(published.module_slug, draft.module_slug);
        assert_eq!(published.status, SectionStatus::Published);
        assert_eq!(published.to_string(), "acme/end-vision#published");
    }
}

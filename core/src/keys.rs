//! Registry key derivation
//!
//! Domain modules rarely pick registry keys by hand. They name an action
//! (`fetch`, `apply`, `agreementSave`) and pass its argument; the key is
//! derived from both so that concurrent invocations on different entities
//! are tracked separately.

/// An action argument that may identify the entity it acts on
///
/// Implement this for domain payloads that carry an id. Arguments without an
/// id (such as `()`) key by action name alone.
pub trait MetaArgument {
    /// The id used in the derived key, if any
    fn meta_id(&self) -> Option<String>;
}

impl MetaArgument for () {
    fn meta_id(&self) -> Option<String> {
        None
    }
}

impl MetaArgument for str {
    fn meta_id(&self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl MetaArgument for String {
    fn meta_id(&self) -> Option<String> {
        Some(self.clone())
    }
}

macro_rules! impl_meta_argument_for_integers {
    ($($ty:ty),*) => {
        $(
            impl MetaArgument for $ty {
                fn meta_id(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

impl_meta_argument_for_integers!(u32, u64, i32, i64, usize);

impl<T: MetaArgument> MetaArgument for Option<T> {
    fn meta_id(&self) -> Option<String> {
        self.as_ref().and_then(MetaArgument::meta_id)
    }
}

impl<T: MetaArgument + ?Sized> MetaArgument for &T {
    fn meta_id(&self) -> Option<String> {
        (**self).meta_id()
    }
}

/// How a registry key is derived from an action name and argument id
///
/// # Examples
///
/// ```
/// use action_meta_core::KeyStyle;
///
/// let style = KeyStyle::ActionName;
/// assert_eq!(style.key("fetch", None), "fetch");
/// assert_eq!(style.key("fetch", Some("7")), "fetch-7");
///
/// let style = KeyStyle::prefixed_id("agreements/");
/// assert_eq!(style.key("agreementSave", Some("3")), "agreements/3");
///
/// let style = KeyStyle::prefixed_action("agreements/");
/// assert_eq!(style.key("agreementSave", Some("3")), "agreements/agreementSave:3");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyStyle {
    /// `<action>` or `<action>-<id>`
    #[default]
    ActionName,
    /// `<prefix><id>`, or `<prefix><action>` without an id
    PrefixedId {
        /// Namespace prepended to every key
        prefix: String,
    },
    /// `<prefix><action>:<id>`, or `<prefix><action>` without an id
    PrefixedAction {
        /// Namespace prepended to every key
        prefix: String,
    },
}

impl KeyStyle {
    /// Prefix + id keys
    #[must_use]
    pub fn prefixed_id(prefix: impl Into<String>) -> Self {
        Self::PrefixedId {
            prefix: prefix.into(),
        }
    }

    /// Prefix + action name + id keys
    #[must_use]
    pub fn prefixed_action(prefix: impl Into<String>) -> Self {
        Self::PrefixedAction {
            prefix: prefix.into(),
        }
    }

    /// Derive the registry key
    #[must_use]
    pub fn key(&self, action: &str, id: Option<&str>) -> String {
        match (self, id) {
            (Self::ActionName, None) => action.to_owned(),
            (Self::ActionName, Some(id)) => format!("{action}-{id}"),
            (Self::PrefixedId { prefix }, Some(id)) => format!("{prefix}{id}"),
            (Self::PrefixedAction { prefix }, Some(id)) => format!("{prefix}{action}:{id}"),
            (Self::PrefixedId { prefix } | Self::PrefixedAction { prefix }, None) => {
                format!("{prefix}{action}")
            },
        }
    }

    /// Derive the registry key for an action argument
    #[must_use]
    pub fn key_for<A: MetaArgument + ?Sized>(&self, action: &str, argument: &A) -> String {
        self.key(action, argument.meta_id().as_deref())
    }
}

/// Define a status enum that is stored as a TEXT column.
///
/// Known values map to unit variants; anything else is preserved verbatim in
/// an `Other(String)` variant so that statuses written by other producers
/// survive a read/write cycle. Generates `as_str`, `Display`, `From<&str>`,
/// `From<String>`, `Into<String>` and serde support through the string form.
///
/// # Usage
///
/// ```ignore
/// string_status! {
///     /// Lifecycle status of a workspace.
///     pub enum WorkspaceStatus {
///         Active => "active",
///         ProcessingTasks => "processing_tasks",
///     }
/// }
/// ```
#[macro_export]
macro_rules! string_status {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $value,)+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s.trim() {
                    $($value => $name::$variant,)+
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::from(s.as_str())
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> Self {
                status.as_str().to_string()
            }
        }
    };
}

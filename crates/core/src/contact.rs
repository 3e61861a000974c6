//! Contact value objects for the data layer.

use serde::Serialize;

/// A contact, converted to the remote-native representation on insert.
/// The client never caches contacts; every operation round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub given_name: Vec<String>,
    pub family_name: Vec<String>,
    pub name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tel: Vec<ContactField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<ContactField>,
}

/// One typed field of a contact (a phone number, an email address).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactField {
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub value: String,
}

impl Contact {
    /// Contact with the composed display name filled in.
    pub fn new(given_name: &str, family_name: &str) -> Self {
        Self {
            given_name: vec![given_name.to_string()],
            family_name: vec![family_name.to_string()],
            name: vec![format!("{given_name} {family_name}")],
            ..Default::default()
        }
    }

    /// The remote-native JSON representation sent to the shell.
    pub fn to_remote(&self) -> shellpilot_runtime::Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Into::into)
    }

    pub(crate) fn display_name(&self) -> String {
        self.name.first().cloned().unwrap_or_default()
    }
}

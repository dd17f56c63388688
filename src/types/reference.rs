use serde::{Deserialize, Deserializer, Serialize};

/// Citation metadata embedded in answer markup.
///
/// The server serializes one of these into the `data-reference` attribute of
/// every citation link. It is only deserialized when the link is opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    /// Title of the cited work.
    #[serde(default)]
    pub title: String,

    /// Author list, already formatted for display.
    #[serde(default)]
    pub authors: String,

    /// Publication year. Accepts either a JSON string or number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,

    /// The cited passage.
    #[serde(default)]
    pub text: String,

    /// Link to the source document, if public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Reference {
    /// Parses a `data-reference` payload.
    pub fn from_payload(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Returns the "authors (year)" line shown under the title.
    pub fn byline(&self) -> String {
        format!("{} ({})", self.authors, self.year)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Text(String),
        Number(serde_json::Number),
        Missing(()),
    }

    Ok(match Year::deserialize(deserializer)? {
        Year::Text(text) => text,
        Year::Number(number) => number.to_string(),
        Year::Missing(()) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let reference = Reference::from_payload(
            r#"{"title":"Open Science","authors":"Doe, J.","year":2021,"text":"A passage.","url":"https://example.org/p"}"#,
        )
        .unwrap();
        assert_eq!(reference.title, "Open Science");
        assert_eq!(reference.year, "2021");
        assert_eq!(reference.url.as_deref(), Some("https://example.org/p"));
        assert_eq!(reference.byline(), "Doe, J. (2021)");
    }

    #[test]
    fn test_string_year_and_missing_url() {
        let reference = Reference::from_payload(
            r#"{"title":"T","authors":"A","year":"n.d.","text":"x"}"#,
        )
        .unwrap();
        assert_eq!(reference.year, "n.d.");
        assert!(reference.url.is_none());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(Reference::from_payload("{\"title\":").is_err());
        assert!(Reference::from_payload("[1,2]").is_err());
    }
}

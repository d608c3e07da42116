// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod download;
mod upload;

pub use download::download;
pub use upload::upload;

use lfs3_common::{AgentError, AgentResult};

/// Object identity recovered from a transfer action href.
///
/// The href's last path segment is the display filename and the segment
/// before it is the object id. The store key is always derived from
/// configuration, so the href cannot redirect a transfer; it only names
/// things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub oid: String,
    pub filename: String,
}

impl ObjectRef {
    pub fn parse(href: &str) -> AgentResult<Self> {
        let trimmed = href.trim_end_matches('/');
        let mut segments = trimmed.rsplitn(3, '/');
        let filename = segments.next().filter(|s| !s.is_empty());
        let oid = segments.next().filter(|s| !s.is_empty());

        match (oid, filename) {
            (Some(oid), Some(filename)) => Ok(Self {
                oid: oid.to_string(),
                filename: filename.to_string(),
            }),
            _ => Err(AgentError::invalid_ref(format!(
                "expected '<oid>/<filename>' in {:?}",
                href
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let r = ObjectRef::parse("s3://bucket/alice/b1715442aa/test.csv").unwrap();
        assert_eq!(r.oid, "b1715442aa");
        assert_eq!(r.filename, "test.csv");
    }

    #[test]
    fn test_parse_two_segments() {
        let r = ObjectRef::parse("b1715442aa/test.csv").unwrap();
        assert_eq!(r.oid, "b1715442aa");
        assert_eq!(r.filename, "test.csv");
    }

    #[test]
    fn test_parse_trailing_slash() {
        let r = ObjectRef::parse("b1715442aa/test.csv/").unwrap();
        assert_eq!(r.filename, "test.csv");
    }

    #[test]
    fn test_parse_rejects_no_separator() {
        let err = ObjectRef::parse("justafilename").unwrap_err();
        assert!(matches!(err, AgentError::InvalidRef(_)));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(ObjectRef::parse("").is_err());
        assert!(ObjectRef::parse("/").is_err());
        assert!(ObjectRef::parse("//name").is_err());
    }
}

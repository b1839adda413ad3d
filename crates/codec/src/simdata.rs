use crate::error::{CodecError, Result};
use crate::xml;

const BINARY_MAGIC: &[u8; 4] = b"DATA";

/// SimData payload. XML documents can be renamed; binary ones are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimData {
    Xml(SimDataXml),
    Binary(Vec<u8>),
}

impl SimData {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(BINARY_MAGIC) {
            return Ok(Self::Binary(bytes.to_vec()));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8("SimData"))?;
        SimDataXml::parse(text).map(Self::Xml)
    }

    #[must_use]
    pub fn instance_name(&self) -> Option<String> {
        match self {
            Self::Xml(doc) => doc.instance_name(),
            Self::Binary(_) => None,
        }
    }
}

/// XML SimData document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDataXml {
    text: String,
}

impl SimDataXml {
    pub fn parse(text: &str) -> Result<Self> {
        let root = xml::find_root(text).ok_or_else(|| CodecError::malformed("no root element"))?;
        if root.name != "SimData" {
            return Err(CodecError::malformed(format!(
                "expected SimData root, found <{}>",
                root.name
            )));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    /// Name of the first instance in the document.
    #[must_use]
    pub fn instance_name(&self) -> Option<String> {
        let tag = self.first_instance()?;
        xml::attribute(&self.text, &tag, "name")
    }

    /// Copy of the document with the first instance renamed.
    pub fn with_instance_name(&self, name: &str) -> Result<Self> {
        let tag = self
            .first_instance()
            .ok_or_else(|| CodecError::malformed("SimData has no instances"))?;
        Ok(Self {
            text: xml::set_attribute(&self.text, &tag, "name", name),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    fn first_instance(&self) -> Option<xml::StartTag> {
        let instances = xml::find_start_tag(&self.text, "Instances", 0)?;
        xml::find_start_tag(&self.text, "I", instances.span.end)
    }
}

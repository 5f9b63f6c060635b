use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Category {
    Form990 => "form990",
    Financial => "financial",
    Tax => "tax",
    Other => "other",
});

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Form990,
        Category::Financial,
        Category::Tax,
        Category::Other,
    ];

    /// Record type assumed when a document carries none of its own.
    pub fn default_record_type(&self) -> &'static str {
        match self {
            Self::Form990 => "Form 990",
            Self::Financial => "Financial Statement",
            Self::Tax => "Tax Return",
            Self::Other => "General",
        }
    }
}

str_enum!(ApprovalAnswer {
    Yes => "yes",
    No => "no",
});

impl ApprovalAnswer {
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// Coarse file kind shown in listings and used by the file-type facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Word,
    Excel,
    Csv,
    Image,
    Text,
    Archive,
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Word => "Word",
            Self::Excel => "Excel",
            Self::Csv => "CSV",
            Self::Image => "Image",
            Self::Text => "Text",
            Self::Archive => "Archive",
            Self::Other => "Other",
        }
    }

    /// Classify from a MIME type, falling back to the file extension.
    pub fn detect(file_name: &str, mime_type: Option<&str>) -> Self {
        let mime = match mime_type.filter(|m| !m.is_empty()) {
            Some(m) => m.to_ascii_lowercase(),
            None => mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        Self::from_mime(&mime)
    }

    fn from_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => Self::Pdf,
            "text/csv" => Self::Csv,
            "application/zip" | "application/x-zip-compressed" | "application/gzip" => {
                Self::Archive
            }
            m if m.starts_with("image/") => Self::Image,
            m if m.contains("spreadsheet") || m.contains("ms-excel") => Self::Excel,
            m if m.contains("wordprocessing") || m == "application/msword" => Self::Word,
            m if m.starts_with("text/") => Self::Text,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Command-line option lists for the external tools
//!
//! Options are accepted as loose strings (`"layout"`, `"-enc UTF-8"`) and
//! normalized into `flag [value]` pairs. Merging is map-like: a repeated flag
//! replaces the earlier value but keeps its original position.

use indexmap::IndexMap;

/// A single normalized option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOption {
    /// Flag token, always starting with `-`
    pub flag: String,
    /// Everything after the first space, if any
    pub value: Option<String>,
}

impl ToolOption {
    /// Normalize a user-supplied option string
    ///
    /// The input is trimmed, prefixed with `-` unless it already starts with
    /// one, and split at the first space into flag and value.
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_to_text::ToolOption;
    ///
    /// let opt = ToolOption::parse("f 1");
    /// assert_eq!(opt.flag, "-f");
    /// assert_eq!(opt.value.as_deref(), Some("1"));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let content = if trimmed.starts_with('-') {
            trimmed.to_string()
        } else {
            format!("-{}", trimmed)
        };

        match content.split_once(' ') {
            Some((flag, value)) => Self {
                flag: flag.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                flag: content,
                value: None,
            },
        }
    }
}

/// Ordered set of options passed to one external tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    entries: IndexMap<String, Option<String>>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from raw option strings
    pub fn parse<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        list.merge(options);
        list
    }

    /// Merge raw option strings into this list
    ///
    /// Later flags override earlier ones with the same name.
    pub fn merge<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in options {
            let opt = ToolOption::parse(raw.as_ref());
            self.entries.insert(opt.flag, opt.value);
        }
    }

    /// Look up the value stored for a flag
    ///
    /// Returns `None` if the flag is absent and `Some(None)` if it is present
    /// without a value.
    pub fn get(&self, flag: &str) -> Option<Option<&str>> {
        self.entries.get(flag).map(|v| v.as_deref())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.entries.contains_key(flag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over options in command-line order
    pub fn iter(&self) -> impl Iterator<Item = ToolOption> + '_ {
        self.entries.iter().map(|(flag, value)| ToolOption {
            flag: flag.clone(),
            value: value.clone(),
        })
    }

    /// Flatten into argv entries: each flag followed by its value, if any
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len() * 2);
        for (flag, value) in &self.entries {
            args.push(flag.clone());
            if let Some(value) = value {
                args.push(value.clone());
            }
        }
        args
    }
}

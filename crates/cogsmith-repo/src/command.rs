//! Subprocess argument templates
//!
//! A [`CommandTemplate`] is a list of tokens such as
//! `git -C {path} rev-list -1 {branch} --`. Formatting substitutes fields
//! inside each token and returns an argument vector, so a substituted value
//! never becomes more than one argument and no shell is ever involved.
//!
//! Field syntax follows Python's `str.format`: `{0}` for positional values,
//! `{name}` for named values, `{{` and `}}` for literal braces. Unnumbered
//! `{}` fields are rejected when the template is built.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Template construction and formatting errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("command cannot be empty")]
    Empty,

    #[error("all positional substitutions must be numbered: '{token}'")]
    UnnumberedField { token: String },

    #[error("malformed field in '{token}': {message}")]
    Malformed { token: String, message: String },

    #[error("no value given for field '{field}'")]
    MissingField { field: String },

    #[error("no value given for positional field {index}")]
    MissingPositional { index: usize },

    #[error("field '{field}' expects a single value, got a list")]
    ListValue { field: String },
}

type TemplateResult<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Positional(usize),
    Named(String),
}

fn parse_token(token: &str) -> TemplateResult<Vec<Segment>> {
    let malformed = |message: &str| TemplateError::Malformed {
        token: token.to_string(),
        message: message.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = token.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(malformed("nested '{' in field")),
                        Some(ch) => field.push(ch),
                        None => return Err(malformed("unmatched '{'")),
                    }
                }

                if field.is_empty() {
                    return Err(TemplateError::UnnumberedField {
                        token: token.to_string(),
                    });
                }
                if field.contains([':', '!', '.', '[']) {
                    return Err(malformed("format specs and attribute access are not supported"));
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                if field.chars().all(|ch| ch.is_ascii_digit()) {
                    let index = field
                        .parse()
                        .map_err(|_| malformed("positional index out of range"))?;
                    segments.push(Segment::Positional(index));
                } else {
                    segments.push(Segment::Named(field));
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(malformed("single '}' encountered")),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Value of a named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A single value
    Text(String),
    /// Several values; only meaningful for the extras keyword
    List(Vec<String>),
}

/// Arguments for [`CommandTemplate::format`]
#[derive(Debug, Clone, Default)]
pub struct FormatArgs {
    positional: Vec<String>,
    named: HashMap<String, FieldValue>,
    skip: HashSet<String>,
}

impl FormatArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a positional value
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add several positional values
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.positional.extend(values.into_iter().map(Into::into));
        self
    }

    /// Set a named value
    ///
    /// For the template's extras keyword a text value is split on whitespace.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named
            .insert(name.into(), FieldValue::Text(value.into()));
        self
    }

    /// Set a named list value (appended verbatim when it is the extras keyword)
    pub fn kwarg_list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.named.insert(
            name.into(),
            FieldValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Leave a template token (as written, before substitution) out of the result
    pub fn skip(mut self, token: impl Into<String>) -> Self {
        self.skip.insert(token.into());
        self
    }
}

/// A declarative builder for subprocess argument vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    components: Vec<String>,
    num_args: Option<usize>,
    extras_kw: Option<String>,
    defaults: HashMap<String, String>,
}

impl CommandTemplate {
    /// Build a template from a string, split on whitespace
    pub fn new(command: &str) -> TemplateResult<Self> {
        Self::from_components(command.split_whitespace())
    }

    /// Build a template from pre-split components
    pub fn from_components<I, S>(components: I) -> TemplateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();

        match components.first() {
            None => return Err(TemplateError::Empty),
            Some(first) if first.is_empty() => return Err(TemplateError::Empty),
            Some(_) => {}
        }
        for component in &components {
            parse_token(component)?;
        }

        Ok(Self {
            components,
            num_args: None,
            extras_kw: None,
            defaults: HashMap::new(),
        })
    }

    /// Limit how many positional values are substituted
    ///
    /// Positional values beyond `n` are appended to the command and formatted
    /// like template tokens.
    pub fn num_args(mut self, n: usize) -> Self {
        self.num_args = Some(n);
        self
    }

    /// Name the keyword whose value is appended as extra arguments
    pub fn extras_kw(mut self, name: impl Into<String>) -> Self {
        self.extras_kw = Some(name.into());
        self
    }

    /// Default value for a named field
    pub fn default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Substitute the given values and return the argument vector
    pub fn format(&self, args: &FormatArgs) -> TemplateResult<Vec<String>> {
        // (token, substitute?)
        let mut params: Vec<(&str, bool)> =
            self.components.iter().map(|c| (c.as_str(), true)).collect();

        let positional = match self.num_args {
            Some(n) if args.positional.len() > n => {
                params.extend(args.positional[n..].iter().map(|p| (p.as_str(), true)));
                &args.positional[..n]
            }
            _ => &args.positional[..],
        };

        if let Some(extras) = self
            .extras_kw
            .as_deref()
            .and_then(|kw| args.named.get(kw))
        {
            match extras {
                FieldValue::Text(text) => {
                    params.extend(text.split_whitespace().map(|p| (p, false)));
                }
                FieldValue::List(values) => {
                    params.extend(values.iter().map(|p| (p.as_str(), false)));
                }
            }
        }

        params
            .into_iter()
            .filter(|(token, _)| !args.skip.contains(*token))
            .map(|(token, substitute)| {
                if substitute {
                    self.substitute(token, positional, args)
                } else {
                    Ok(token.to_string())
                }
            })
            .collect()
    }

    fn substitute(
        &self,
        token: &str,
        positional: &[String],
        args: &FormatArgs,
    ) -> TemplateResult<String> {
        let mut out = String::with_capacity(token.len());

        for segment in parse_token(token)? {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Positional(index) => {
                    let value = positional
                        .get(index)
                        .ok_or(TemplateError::MissingPositional { index })?;
                    out.push_str(value);
                }
                Segment::Named(field) => {
                    let is_extras = self.extras_kw.as_deref() == Some(field.as_str());
                    match args.named.get(&field).filter(|_| !is_extras) {
                        Some(FieldValue::Text(value)) => out.push_str(value),
                        Some(FieldValue::List(_)) => {
                            return Err(TemplateError::ListValue { field });
                        }
                        None => {
                            let value = self
                                .defaults
                                .get(&field)
                                .ok_or(TemplateError::MissingField { field: field.clone() })?;
                            out.push_str(value);
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

// ============ Command Table ============

/// The git, pip and python invocations used by the downloader
#[derive(Debug, Clone)]
pub struct Commands {
    pub git_checkout_local: CommandTemplate,
    pub git_clone: CommandTemplate,
    pub git_clone_no_branch: CommandTemplate,
    pub git_current_branch: CommandTemplate,
    pub git_latest_commit: CommandTemplate,
    pub git_hard_reset: CommandTemplate,
    pub git_pull: CommandTemplate,
    pub git_diff_file_status: CommandTemplate,
    pub git_log: CommandTemplate,
    pub git_discover_remote_url: CommandTemplate,
    pub pip_install: CommandTemplate,
    pub pip_install_no_target: CommandTemplate,
    pub pip_show: CommandTemplate,
    pub python_version: CommandTemplate,
}

fn template(command: &str) -> CommandTemplate {
    CommandTemplate::new(command).expect("built-in command templates are valid")
}

impl Commands {
    fn build() -> Self {
        Self {
            git_checkout_local: template("git -C {path} checkout {branch} --").extras_kw("paths"),
            git_clone: template("git clone -b {branch} {url} {folder}"),
            git_clone_no_branch: template("git clone {url} {folder}"),
            git_current_branch: template("git -C {path} rev-parse --abbrev-ref HEAD"),
            git_latest_commit: template("git -C {path} rev-list -1 {branch} --")
                .extras_kw("relative_file_path"),
            git_hard_reset: template("git -C {path} reset --hard {remote}/{branch} -q")
                .default("remote", "origin"),
            git_pull: template("git -C {path} pull -q --ff-only"),
            git_diff_file_status: template(
                "git -C {path} diff --no-commit-id --name-status {old_ref}..{new_ref}",
            ),
            git_log: template(
                "git -C {path} log --relative-date --reverse {old_ref}.. {relative_file_path}",
            ),
            git_discover_remote_url: template("git -C {path} config --get remote.{remote}.url")
                .default("remote", "origin"),
            pip_install: template("{python} -m pip install -U -t {target_dir}").extras_kw("reqs"),
            pip_install_no_target: template(
                "{python} -m pip --disable-pip-version-check install -U",
            )
            .extras_kw("reqs"),
            pip_show: template("{python} -m pip --disable-pip-version-check show")
                .extras_kw("packages"),
            python_version: template("{python} --version"),
        }
    }
}

/// Built-in command table
pub static COMMANDS: Lazy<Commands> = Lazy::new(Commands::build);

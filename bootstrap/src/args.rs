//! Command line arguments, split into `--name[=value]` options and plain arguments.

use std::collections::BTreeMap;
use std::ffi::OsString;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
    #[error("argument {0:?} is not valid unicode")]
    NotUnicode(String),
    #[error("invalid option {0:?}: option name must not be empty")]
    InvalidOption(String),
}

/// The process arguments, as received and as parsed.
///
/// Options may be repeated; their values accumulate in order. An option given
/// without `=value` is present with no values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineArgs {
    raw: Vec<String>,
    options: BTreeMap<String, Vec<String>>,
    non_options: Vec<String>,
}

impl CommandLineArgs {
    /// Parse the argument vector, program name excluded.
    pub fn parse<I>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut parsed = CommandLineArgs::default();

        for arg in args {
            let arg = arg
                .into_string()
                .map_err(|arg| ArgsError::NotUnicode(arg.to_string_lossy().into_owned()))?;

            if let Some(option) = arg.strip_prefix("--") {
                let (name, value) = match option.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (option, None),
                };
                if name.is_empty() {
                    return Err(ArgsError::InvalidOption(arg));
                }
                let values = parsed.options.entry(name.to_owned()).or_default();
                if let Some(value) = value {
                    values.push(value.to_owned());
                }
            } else {
                parsed.non_options.push(arg.clone());
            }

            parsed.raw.push(arg);
        }

        Ok(parsed)
    }

    /// Arguments exactly as they were given.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn contains_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn option_values(&self, name: &str) -> Option<&[String]> {
        self.options.get(name).map(Vec::as_slice)
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// Option values joined with `,`; an option given without a value yields `""`.
    pub fn property(&self, name: &str) -> Option<String> {
        self.options.get(name).map(|values| values.join(","))
    }

    pub fn non_option_args(&self) -> &[String] {
        &self.non_options
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CommandLineArgs, ArgsError> {
        CommandLineArgs::parse(args.iter().map(OsString::from))
    }

    #[test]
    fn empty() {
        let args = parse(&[]).unwrap();
        assert!(args.is_empty());
        assert_eq!(args.option_names().count(), 0);
        assert!(args.non_option_args().is_empty());
    }

    #[test]
    fn options_and_plain_arguments() {
        let args = parse(&["--server.port=9090", "run", "--debug", "extra"]).unwrap();

        assert_eq!(args.property("server.port").as_deref(), Some("9090"));
        assert!(args.contains_option("debug"));
        assert_eq!(args.property("debug").as_deref(), Some(""));
        assert_eq!(args.non_option_args(), ["run", "extra"]);
        assert_eq!(
            args.raw(),
            ["--server.port=9090", "run", "--debug", "extra"]
        );
    }

    #[test]
    fn repeated_options_accumulate() {
        let args = parse(&["--profile=a", "--profile=b", "--profile"]).unwrap();
        assert_eq!(
            args.option_values("profile"),
            Some(["a".to_owned(), "b".to_owned()].as_slice())
        );
        assert_eq!(args.property("profile").as_deref(), Some("a,b"));
    }

    #[test]
    fn value_may_contain_equals() {
        let args = parse(&["--filter=a=b"]).unwrap();
        assert_eq!(args.property("filter").as_deref(), Some("a=b"));
    }

    #[test]
    fn single_dash_is_not_an_option() {
        let args = parse(&["-v", "-"]).unwrap();
        assert_eq!(args.option_names().count(), 0);
        assert_eq!(args.non_option_args(), ["-v", "-"]);
    }

    #[test]
    fn empty_option_name_is_rejected() {
        assert_eq!(
            parse(&["--"]),
            Err(ArgsError::InvalidOption("--".to_owned()))
        );
        assert_eq!(
            parse(&["--=value"]),
            Err(ArgsError::InvalidOption("--=value".to_owned()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_is_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let arg = OsString::from_vec(vec![b'-', b'-', 0xff]);
        assert!(matches!(
            CommandLineArgs::parse(vec![arg]),
            Err(ArgsError::NotUnicode(_))
        ));
    }
}

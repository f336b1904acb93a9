// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::Error;

/// Turn the raw username arguments into the list of GitHub usernames to
/// provision.
///
/// A single argument is treated as a comma-separated list. Multiple
/// arguments are taken one username each, with any commas stripped from
/// them. No other normalization happens: whitespace, case, duplicates and
/// empty entries are passed through untouched.
///
/// # Example
///
/// ```
/// # use libghkeys::parse_usernames;
/// let args = vec!["alice,bob".to_string()];
/// assert_eq!(parse_usernames(&args).unwrap(), ["alice", "bob"]);
///
/// let args = vec!["alice".to_string(), "bob,".to_string()];
/// assert_eq!(parse_usernames(&args).unwrap(), ["alice", "bob"]);
/// ```
pub fn parse_usernames(args: &[String]) -> Result<Vec<String>, Error> {
    match args {
        [] => Err(Error::NoUsernames),
        [list] => Ok(list.split(',').map(String::from).collect()),
        _ => Ok(args.iter().map(|arg| arg.replace(',', "")).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_usernames;
    use crate::error::Error;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_is_an_error() {
        assert!(matches!(parse_usernames(&[]), Err(Error::NoUsernames)));
    }

    #[test]
    fn single_argument_is_split_on_commas() {
        assert_eq!(
            parse_usernames(&args(&["alice,bob"])).unwrap(),
            ["alice", "bob"]
        );
        assert_eq!(
            parse_usernames(&args(&["alice,bob,carol"])).unwrap(),
            ["alice", "bob", "carol"]
        );
    }

    #[test]
    fn single_argument_without_comma() {
        assert_eq!(parse_usernames(&args(&["alice"])).unwrap(), ["alice"]);
    }

    #[test]
    fn single_argument_keeps_empty_pieces() {
        assert_eq!(
            parse_usernames(&args(&["alice,,bob,"])).unwrap(),
            ["alice", "", "bob", ""]
        );
    }

    #[test]
    fn multiple_arguments_strip_commas() {
        assert_eq!(
            parse_usernames(&args(&["alice", "bob,"])).unwrap(),
            ["alice", "bob"]
        );
        assert_eq!(
            parse_usernames(&args(&[",alice", "b,o,b", "carol"])).unwrap(),
            ["alice", "bob", "carol"]
        );
    }

    #[test]
    fn no_trimming_or_case_folding() {
        assert_eq!(
            parse_usernames(&args(&[" Alice", "BOB "])).unwrap(),
            [" Alice", "BOB "]
        );
        assert_eq!(
            parse_usernames(&args(&["alice", "alice"])).unwrap(),
            ["alice", "alice"]
        );
    }
}

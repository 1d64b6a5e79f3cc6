//! Compiler error interpretation
//!
//! Matches raw compiler and deployment error text against a fixed table of
//! known signatures and replaces it with an explanation that carries the
//! details pulled out of the message. Unknown messages pass through unchanged.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Known error families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerErrorKind {
    VersionMismatch,
    MissingSource,
    ParserError,
    DeclarationError,
    WrongArgumentCount,
    InsufficientFunds,
    NotAContract,
    TransferExceedsBalance,
}

impl fmt::Display for CompilerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerErrorKind::VersionMismatch => "version mismatch",
            CompilerErrorKind::MissingSource => "missing source file",
            CompilerErrorKind::ParserError => "syntax error",
            CompilerErrorKind::DeclarationError => "declaration error",
            CompilerErrorKind::WrongArgumentCount => "wrong argument count",
            CompilerErrorKind::InsufficientFunds => "insufficient funds",
            CompilerErrorKind::NotAContract => "not a contract",
            CompilerErrorKind::TransferExceedsBalance => "transfer exceeds balance",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of interpreting one raw message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    /// Matched error family, `None` when the message is unknown
    pub kind: Option<CompilerErrorKind>,
    /// Explanation, or the raw message when nothing matched
    pub message: String,
}

impl Interpretation {
    pub fn is_known(&self) -> bool {
        self.kind.is_some()
    }
}

struct Signature {
    kind: CompilerErrorKind,
    pattern: Regex,
    explain: fn(&Captures<'_>, &str) -> String,
}

/// Translates raw compiler errors into explanations
pub struct ErrorInterpreter {
    signatures: Vec<Signature>,
    identifier: Regex,
}

impl fmt::Debug for ErrorInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorInterpreter")
            .field("signatures", &self.signatures.len())
            .finish()
    }
}

impl Default for ErrorInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorInterpreter {
    /// Create an interpreter with the built-in signature table
    pub fn new() -> Self {
        // Order matters: a missing source is reported as a ParserError by solc
        let signatures = vec![
            Signature {
                kind: CompilerErrorKind::VersionMismatch,
                pattern: Regex::new(
                    r"(?is)requires different compiler version(?:.*?current compiler is\s+v?(\d+(?:\.\d+){0,2}))?",
                )
                .expect("Invalid version mismatch regex"),
                explain: explain_version_mismatch,
            },
            Signature {
                kind: CompilerErrorKind::MissingSource,
                pattern: Regex::new(r#"(?i)source\s+"([^"]+)"\s+not found"#)
                    .expect("Invalid missing source regex"),
                explain: explain_missing_source,
            },
            Signature {
                kind: CompilerErrorKind::ParserError,
                pattern: Regex::new(r"ParserError:?\s*([^\n]*)")
                    .expect("Invalid parser error regex"),
                explain: explain_parser_error,
            },
            Signature {
                kind: CompilerErrorKind::DeclarationError,
                pattern: Regex::new(r"DeclarationError:?\s*([^\n]*)")
                    .expect("Invalid declaration error regex"),
                explain: explain_declaration_error,
            },
            Signature {
                kind: CompilerErrorKind::WrongArgumentCount,
                pattern: Regex::new(
                    r"(?i)wrong argument count for [a-z ]+?:\s*(\d+)\s+arguments? given but expected\s+(\d+)",
                )
                .expect("Invalid argument count regex"),
                explain: explain_argument_count,
            },
            Signature {
                kind: CompilerErrorKind::InsufficientFunds,
                pattern: Regex::new(r"(?i)insufficient funds")
                    .expect("Invalid insufficient funds regex"),
                explain: |_, _| {
                    "The deploying account does not hold enough ETH to pay for gas and value. \
                     Request test ETH from a faucet for this network and try again."
                        .to_string()
                },
            },
            Signature {
                kind: CompilerErrorKind::NotAContract,
                pattern: Regex::new(r"(?i)(?:not a contract|non-contract|call to non-contract)")
                    .expect("Invalid not-a-contract regex"),
                explain: |_, _| {
                    "The target address holds no contract code. Check that the address is \
                     correct and that the contract is deployed on the selected network."
                        .to_string()
                },
            },
            Signature {
                kind: CompilerErrorKind::TransferExceedsBalance,
                pattern: Regex::new(r"(?i)transfer amount exceeds balance")
                    .expect("Invalid transfer balance regex"),
                explain: |_, _| {
                    "The token transfer is larger than the sender's balance. Mint or \
                     receive tokens first, or transfer a smaller amount."
                        .to_string()
                },
            },
        ];

        Self {
            signatures,
            identifier: Regex::new(r#"["'`]([A-Za-z_$][A-Za-z0-9_$]*)["'`]"#)
                .expect("Invalid identifier regex"),
        }
    }

    /// Interpret a raw message
    pub fn interpret(&self, raw: &str) -> Interpretation {
        for signature in &self.signatures {
            if let Some(captures) = signature.pattern.captures(raw) {
                let detail = match signature.kind {
                    CompilerErrorKind::DeclarationError => self.identifier_in(raw),
                    _ => None,
                };
                let message = (signature.explain)(&captures, detail.as_deref().unwrap_or(""));
                tracing::debug!("Compiler error classified as {}", signature.kind);
                return Interpretation {
                    kind: Some(signature.kind),
                    message,
                };
            }
        }

        Interpretation {
            kind: None,
            message: raw.to_string(),
        }
    }

    /// Explanation for a raw message, the message itself when unknown
    pub fn explain(&self, raw: &str) -> String {
        self.interpret(raw).message
    }

    fn identifier_in(&self, raw: &str) -> Option<String> {
        self.identifier
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

static BUILTIN: LazyLock<ErrorInterpreter> = LazyLock::new(ErrorInterpreter::new);

/// Interpret with the built-in signature table
pub fn interpret_compiler_error(raw: &str) -> String {
    BUILTIN.explain(raw)
}

fn group<'a>(captures: &'a Captures<'_>, index: usize) -> &'a str {
    captures.get(index).map(|m| m.as_str().trim()).unwrap_or("")
}

fn explain_version_mismatch(captures: &Captures<'_>, _: &str) -> String {
    let version = group(captures, 1);
    if version.is_empty() {
        return "Compiler version mismatch: the pragma in your contract does not accept the \
                compiler in use. Change the pragma to a range that includes the selected \
                compiler version."
            .to_string();
    }
    format!(
        "Compiler version mismatch: the pragma in your contract does not accept the compiler \
         in use (version {version}). Change the pragma to a range that includes it, \
         for example `pragma solidity ^{version};`."
    )
}

fn explain_missing_source(captures: &Captures<'_>, _: &str) -> String {
    let path = group(captures, 1);
    format!(
        "Imported file \"{path}\" could not be found. Check the import path against the \
         project tree, or use a supported library prefix such as @openzeppelin/contracts/."
    )
}

fn explain_parser_error(captures: &Captures<'_>, _: &str) -> String {
    let detail = group(captures, 1);
    if detail.is_empty() {
        "Syntax error: the compiler could not parse the contract. Look for a missing \
         semicolon, an unbalanced brace or a misspelled keyword."
            .to_string()
    } else {
        format!(
            "Syntax error: {detail}. Look for a missing semicolon, an unbalanced brace or a \
             misspelled keyword near the reported location."
        )
    }
}

fn explain_declaration_error(_: &Captures<'_>, identifier: &str) -> String {
    if identifier.is_empty() {
        "Declaration error: a name is used before it is declared, or declared twice. Check \
         spelling and make sure the defining file is imported."
            .to_string()
    } else {
        format!(
            "Declaration error: `{identifier}` is not declared or not visible here. Check its \
             spelling and make sure the file that defines it is imported."
        )
    }
}

fn explain_argument_count(captures: &Captures<'_>, _: &str) -> String {
    let given = group(captures, 1);
    let expected = group(captures, 2);
    format!(
        "Wrong number of arguments: {given} given but {expected} expected. Since \
         OpenZeppelin 5, `Ownable` takes the initial owner in its constructor, \
         e.g. `constructor() Ownable(msg.sender) {{}}`."
    )
}

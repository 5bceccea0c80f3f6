//! Parsing of answers: `COMMAND|KEY=VALUE|...\r\n[payload]`.

use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::{ProtocolError, Result};
use crate::protocol::consts::{Command, Param};
use crate::protocol::retcode::{parse_retcode, RetCode};

/// Split an answer line into its command and parameters.
///
/// Only the first line of `text` is considered. Segments without `=` are
/// ignored, keys are upper-cased, and a repeated key keeps its last value.
/// A value may itself contain `=`; only the first one separates key and value.
pub fn parse_response_line(text: &str) -> (String, HashMap<String, String>) {
    let line = first_line(text);
    let mut segments = line.split('|');
    let command = segments.next().unwrap_or("").to_string();

    let params = segments
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.to_uppercase(), value.to_string()))
        .collect();

    (command, params)
}

fn first_line(text: &str) -> &str {
    let line = text.split('\n').next().unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}

/// A parsed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: String,
    pub params: HashMap<String, String>,
    /// Everything after the first line, e.g. a JSON document.
    pub body: Option<String>,
}

impl Response {
    pub fn parse(text: &str) -> Self {
        let (command, params) = parse_response_line(text);
        let body = text
            .split_once('\n')
            .map(|(_, rest)| rest)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        Self {
            command,
            params,
            body,
        }
    }

    /// Fail unless the answer echoes `expected`.
    pub fn expect_command(&self, expected: Command) -> Result<()> {
        if self.command == expected.as_str() {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedCommand {
                expected: expected.as_str().to_string(),
                received: self.command.clone(),
            })
        }
    }

    pub fn get(&self, param: Param) -> Option<&str> {
        self.params.get(param.as_str()).map(String::as_str)
    }

    /// A field that must be present and not the `none` placeholder.
    pub fn require(&self, param: Param) -> Result<&str> {
        match self.get(param) {
            Some(value) if !value.is_empty() && !value.eq_ignore_ascii_case("none") => Ok(value),
            _ => Err(ProtocolError::MissingField(param.as_str())),
        }
    }

    /// The `RETCODE` field.
    pub fn retcode(&self) -> Result<RetCode> {
        parse_retcode(self.require(Param::RetCode)?)
    }

    /// Decode the payload that follows the answer line.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .as_deref()
            .ok_or(ProtocolError::MissingField(Param::BodyText.as_str()))?;
        Ok(serde_json::from_str(body)?)
    }
}

// License below.
//! Parses the `--seeds` config file: one label per line, `addr,kind[,name]`.
//!
//! Teacher precedent: none directly — the teacher has no external config
//! format — but the "log and skip, never abort" handling follows the same
//! recoverable/fatal split `src/error.rs` documents for decode errors.
#![warn(missing_docs)]

use std::fs;
use std::path::Path;

use crate::label::LabelKind;

/// One parsed line from a seed file: an address, its label kind, and an
/// optional symbol name.
pub type Seed = (u32, LabelKind, Option<String>);

/// Reads and parses a seed file, skipping malformed lines with a `warn` log.
///
/// Never fails: an unreadable file is logged at `warn` and treated as an
/// empty seed list, since `--seeds` is optional and its absence is routine.
pub fn load(path: &Path) -> Vec<Seed> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!("Could not read seed file {:?}: {}", path, e);
            return Vec::new();
        }
    };

    let mut seeds = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        match parse_line(line) {
            Some(seed) => seeds.push(seed),
            None => warn!("Skipping malformed seed at {}:{}: {:?}", path.display(), lineno + 1, line),
        }
    }
    seeds
}

fn parse_line(line: &str) -> Option<Seed> {
    let mut fields = line.splitn(3, ',').map(str::trim);
    let addr_str = fields.next()?;
    let kind_str = fields.next()?;
    let name = fields.next().filter(|s| !s.is_empty()).map(String::from);

    let addr = parse_hex(addr_str)?;
    let kind = match kind_str.to_ascii_lowercase().as_str() {
        "arm" => LabelKind::ArmCode,
        "thumb" => LabelKind::ThumbCode,
        "pool" => LabelKind::Pool,
        "data" => LabelKind::Data,
        _ => return None,
    };
    Some((addr, kind, name))
}

fn parse_hex(s: &str) -> Option<u32> {
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_a_named_arm_seed() {
        let seed = parse_line("0x02000000,arm,EntryPoint").unwrap();
        assert_eq!(seed, (0x0200_0000, LabelKind::ArmCode, Some("EntryPoint".to_string())));
    }

    #[test]
    fn parses_an_unnamed_thumb_seed() {
        let seed = parse_line("0x0200A4,thumb").unwrap();
        assert_eq!(seed, (0x0002_00A4, LabelKind::ThumbCode, None));
    }

    #[test]
    fn rejects_an_unknown_kind() {
        assert!(parse_line("0x02000000,bogus").is_none());
    }

    #[test]
    fn rejects_an_unparsable_address() {
        assert!(parse_line("not_hex,arm").is_none());
    }

    #[test]
    fn blank_and_comment_lines_are_ignored_without_warning() {
        // load() itself isn't exercised here (it touches the filesystem);
        // this just documents that parse_line never sees these lines.
        assert!(parse_line("").is_none());
    }
}


/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/

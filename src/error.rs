// License below.
//! Defines the error type shared across decoding, analysis, and rendering.
#![cfg_attr(feature="clippy", warn(result_unwrap_used, option_unwrap_used, print_stdout))]
#![warn(missing_docs)]

use std::error;
use std::fmt;
use std::io;

/// Errors that can arise while decoding, analyzing, or rendering an image.
///
/// Only [`DisasmError::UnalignedFunction`] and [`DisasmError::RomTooLarge`] are
/// fatal; the decode errors are treated by the analyzer as classification
/// hints and never abort a run. See the crate's top-level documentation for
/// the full fatal/recoverable/silent distinction.
#[derive(Debug)]
pub enum DisasmError {
    /// A 32-bit word did not decode to any known ARM instruction.
    InvalidArmInstruction(u32),
    /// A 16-bit half-word did not decode to any known THUMB instruction.
    InvalidThumbInstruction(u16),
    /// A function label was discovered at an address that violates its
    /// mode's alignment requirement (4 for ARM, 2 for THUMB).
    UnalignedFunction(u32),
    /// The image is too large to be addressed from its configured base.
    RomTooLarge(usize),
    /// Writing the rendered assembly to its output sink failed.
    Io(io::Error),
}

impl error::Error for DisasmError {
    fn description(&self) -> &str {
        match *self {
            DisasmError::InvalidArmInstruction(_)   => "invalid instruction in ARM state",
            DisasmError::InvalidThumbInstruction(_) => "invalid instruction in THUMB state",
            DisasmError::UnalignedFunction(_)       => "function label at unaligned address",
            DisasmError::RomTooLarge(_)             => "image too large for its base address",
            DisasmError::Io(_)                      => "failed to write rendered output",
        }
    }
}

impl fmt::Display for DisasmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DisasmError::InvalidArmInstruction(x)   => write!(f, "invalid ARM instruction {:#010X}", x),
            DisasmError::InvalidThumbInstruction(x) => write!(f, "invalid THUMB instruction {:#06X}", x),
            DisasmError::UnalignedFunction(a)       => write!(f, "function label at unaligned address {:#010X}", a),
            DisasmError::RomTooLarge(n)             => write!(f, "image of {} bytes does not fit below 0x100000000", n),
            DisasmError::Io(ref e)                  => write!(f, "output error: {}", e),
        }
    }
}

impl From<io::Error> for DisasmError {
    fn from(e: io::Error) -> DisasmError { DisasmError::Io(e) }
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

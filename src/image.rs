// License below.
//! A bounds-checked, read-only view onto a loaded ROM image.
//!
//! Generalizes the teacher's [`RawBytes`]/[`Rom8`]/[`Rom16`]/[`Rom32`] traits
//! (`src/hardware/memory.rs`) from a panicking, mutable memory-mapped bus
//! into a single read-only window with `Result`-returning accessors: nothing
//! here ever executes code, so an out-of-range access is routine input to
//! reject, not a hardware fault to panic on.
#![warn(missing_docs)]

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DisasmError;

/// A flat, little-endian byte buffer mapped at a fixed base address.
///
/// `base` is the address the first byte of `bytes` is loaded at (e.g.
/// `0x02000000` for a binary blob placed at the start of main RAM). All
/// accessors take absolute addresses and translate them internally.
pub struct Image {
    base: u32,
    bytes: Vec<u8>,
}

impl Image {
    /// Wraps a byte buffer as an image based at `base`.
    ///
    /// Fails if the image would not fit below the 32-bit address space when
    /// loaded at `base`.
    pub fn new(base: u32, bytes: Vec<u8>) -> Result<Image, DisasmError> {
        if (base as u64) + (bytes.len() as u64) > (u32::max_value() as u64) + 1 {
            return Err(DisasmError::RomTooLarge(bytes.len()));
        }
        Ok(Image { base, bytes })
    }

    /// The address of the first byte of the image.
    pub fn base(&self) -> u32 { self.base }

    /// The address one past the last byte of the image.
    pub fn end(&self) -> u32 { self.base + (self.bytes.len() as u32) }

    /// The size of the image in bytes.
    pub fn len(&self) -> usize { self.bytes.len() }

    /// Whether `address` names a byte that is actually part of this image.
    pub fn contains(&self, address: u32) -> bool {
        address >= self.base && address < self.end()
    }

    /// Whether `[address, address + size)` lies entirely within the image.
    pub fn contains_range(&self, address: u32, size: u32) -> bool {
        match address.checked_add(size) {
            Some(end) => address >= self.base && end <= self.end(),
            None => false,
        }
    }

    fn offset(&self, address: u32) -> Option<usize> {
        if self.contains(address) { Some((address - self.base) as usize) } else { None }
    }

    /// Reads a single byte at `address`.
    pub fn byte_at(&self, address: u32) -> Option<u8> {
        self.offset(address).map(|o| self.bytes[o])
    }

    /// Reads a little-endian half-word at `address`, which need not be aligned.
    pub fn halfword_at(&self, address: u32) -> Option<u16> {
        if !self.contains_range(address, 2) { return None; }
        let o = self.offset(address)?;
        Some(LittleEndian::read_u16(&self.bytes[o..o + 2]))
    }

    /// Reads a little-endian word at `address`, which need not be aligned.
    pub fn word_at(&self, address: u32) -> Option<u32> {
        if !self.contains_range(address, 4) { return None; }
        let o = self.offset(address)?;
        Some(LittleEndian::read_u32(&self.bytes[o..o + 4]))
    }

    /// The raw byte slice backing this image, for sequential scans.
    pub fn bytes(&self) -> &[u8] { &self.bytes }

    /// Reads an entire file into memory and wraps it as an image based at `base`.
    pub fn load_from_file(base: u32, path: &Path) -> Result<Image, DisasmError> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        info!("Loaded {} bytes from {:?} at base {:#010X}", bytes.len(), path, base);
        Image::new(base, bytes)
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

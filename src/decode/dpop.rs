// License below.
//! Implements data processing opcodes shared by ARM and THUMB instructions.
#![warn(missing_docs)]

use std::fmt;
use std::mem;

/// A data processing opcode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ArmDpop {
    #[doc = "Bitwise AND"]                  And = 0b0000,
    #[doc = "Bitwise XOR"]                  Eor = 0b0001,
    #[doc = "Subtraction"]                  Sub = 0b0010,
    #[doc = "Reverse subtraction"]          Rsb = 0b0011,
    #[doc = "Addition"]                     Add = 0b0100,
    #[doc = "Add with carry"]               Adc = 0b0101,
    #[doc = "Subtract with borrow"]         Sbc = 0b0110,
    #[doc = "Reverse subtract with borrow"] Rsc = 0b0111,
    #[doc = "Test bits"]                    Tst = 0b1000,
    #[doc = "Test bitwise equality"]        Teq = 0b1001,
    #[doc = "Compare"]                      Cmp = 0b1010,
    #[doc = "Compare negative"]             Cmn = 0b1011,
    #[doc = "Bitwise OR"]                   Orr = 0b1100,
    #[doc = "Move value"]                   Mov = 0b1101,
    #[doc = "Bit clear"]                    Bic = 0b1110,
    #[doc = "Move bitwise negated value"]   Mvn = 0b1111,
}

impl ArmDpop {
    /// Decodes a 4-bit data processing opcode field.
    pub fn decode(bits: u8) -> ArmDpop {
        debug_assert!(bits <= 0b1111);
        unsafe { mem::transmute(bits & 0b1111) }
    }

    /// Checks whether this instruction writes no result to a destination
    /// register (`TST`, `TEQ`, `CMP`, `CMN`).
    pub fn is_test(self) -> bool {
        matches!(self, ArmDpop::Tst | ArmDpop::Teq | ArmDpop::Cmp | ArmDpop::Cmn)
    }

    /// Checks whether this is a move instruction (`MOV`, `MVN`).
    pub fn is_move(self) -> bool {
        matches!(self, ArmDpop::Mov | ArmDpop::Mvn)
    }
}

impl fmt::Display for ArmDpop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            ArmDpop::And => "and", ArmDpop::Eor => "eor",
            ArmDpop::Sub => "sub", ArmDpop::Rsb => "rsb",
            ArmDpop::Add => "add", ArmDpop::Adc => "adc",
            ArmDpop::Sbc => "sbc", ArmDpop::Rsc => "rsc",
            ArmDpop::Tst => "tst", ArmDpop::Teq => "teq",
            ArmDpop::Cmp => "cmp", ArmDpop::Cmn => "cmn",
            ArmDpop::Orr => "orr", ArmDpop::Mov => "mov",
            ArmDpop::Bic => "bic", ArmDpop::Mvn => "mvn",
        };
        write!(f, "{}", s)
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

// License below.
//! Implements the 4-bit condition field shared by ARM and THUMB branch
//! instructions.
#![warn(missing_docs)]

use std::mem;

/// The condition field of an ARM instruction, or of a THUMB conditional
/// branch.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ArmCondition {
    #[doc = "Z set. EQual."]                                       EQ = 0b0000,
    #[doc = "Z clear. Not Equal."]                                 NE = 0b0001,
    #[doc = "C set. Unsigned Higher or Same."]                     HS = 0b0010,
    #[doc = "C clear. Unsigned LOwer."]                            LO = 0b0011,
    #[doc = "N set. MInus, i.e. negative."]                        MI = 0b0100,
    #[doc = "N clear. PLus, i.e. positive or zero."]               PL = 0b0101,
    #[doc = "V set. Overflow."]                                    VS = 0b0110,
    #[doc = "V clear. No overflow."]                               VC = 0b0111,
    #[doc = "C set and Z clear. Unsigned HIgher."]                 HI = 0b1000,
    #[doc = "C clear or Z set. Unsigned Lower or Same."]           LS = 0b1001,
    #[doc = "N equals V. Greater than or Equal to."]               GE = 0b1010,
    #[doc = "N distinct from V. Less Than."]                       LT = 0b1011,
    #[doc = "Z clear and N equals V. Greater Than."]               GT = 0b1100,
    #[doc = "Z set or N distinct from V. Less than or Equal to."]  LE = 0b1101,
    #[doc = "ALways execute this instruction, i.e. no condition."] AL = 0b1110,
    #[doc = "Reserved."]                                           NV = 0b1111,
}

impl ArmCondition {
    /// Decodes a 4-bit condition field.
    pub fn decode(bits: u8) -> ArmCondition {
        debug_assert!(bits <= 0b1111);
        unsafe { mem::transmute(bits & 0b1111) }
    }

    /// Whether this condition is `AL`, i.e. the instruction is unconditional.
    pub fn is_always(self) -> bool { self == ArmCondition::AL }

    /// The GNU-assembler suffix for this condition. Empty for `AL`, since
    /// unconditional instructions are never suffixed in the rendered output.
    pub fn assembly_name(self) -> &'static str {
        match self {
            ArmCondition::EQ => "eq", ArmCondition::NE => "ne",
            ArmCondition::HS => "hs", ArmCondition::LO => "lo",
            ArmCondition::MI => "mi", ArmCondition::PL => "pl",
            ArmCondition::VS => "vs", ArmCondition::VC => "vc",
            ArmCondition::HI => "hi", ArmCondition::LS => "ls",
            ArmCondition::GE => "ge", ArmCondition::LT => "lt",
            ArmCondition::GT => "gt", ArmCondition::LE => "le",
            ArmCondition::AL => "",   ArmCondition::NV => "nv",
        }
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

//! Device idiom and scale factor as they appear in Contents.json.
//!
//! Example: { "idiom": "ipad", "scale": "2x" }  =>  (Idiom::Ipad, Scale::X2)

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Idiom {
    #[serde(rename = "iphone")]
    Iphone,
    #[serde(rename = "ipad")]
    Ipad,
    #[serde(rename = "ios-marketing")]
    IosMarketing,
}

impl Idiom {
    pub fn as_str(self) -> &'static str {
        match self {
            Idiom::Iphone => "iphone",
            Idiom::Ipad => "ipad",
            Idiom::IosMarketing => "ios-marketing",
        }
    }
}

impl fmt::Display for Idiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "1x")]
    X1,
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "3x")]
    X3,
}

impl Scale {
    pub fn factor(self) -> u32 {
        match self {
            Scale::X1 => 1,
            Scale::X2 => 2,
            Scale::X3 => 3,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

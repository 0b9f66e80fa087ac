//! Enumerated parameter modes.
//!
//! Each mode has a stable uniform index; shaders receive the index, never
//! the name. Names are the persisted (and parameter-string) form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! indexed_mode {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => ($key:literal, $index:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $key)] $variant),+
        }

        impl $name {
            /// Every variant in index order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Uniform index passed to shaders.
            pub fn index(&self) -> u32 {
                match self {
                    $($name::$variant => $index),+
                }
            }

            /// Persisted name.
            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not a {} (expected one of: {})",
                        other,
                        stringify!($name),
                        [$($key),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

indexed_mode! {
    /// How a multi-input node combines its layers.
    pub enum BlendingMode {
        Over => ("over", 0),
        Under => ("under", 1),
        Add => ("add", 2),
        Multiply => ("multiply", 3),
        Difference => ("difference", 4),
        Subtract => ("subtract", 5),
        Maximum => ("maximum", 6),
        Minimum => ("minimum", 7),
    }
}

indexed_mode! {
    /// How an input is fitted into a differently-shaped working resolution.
    pub enum FillMode {
        Fill => ("fill", 0),
        AspectFit => ("aspectFit", 1),
        AspectFill => ("aspectFill", 2),
    }
}

indexed_mode! {
    /// What sampling returns outside the unit square.
    pub enum ExtendMode {
        Hold => ("hold", 0),
        Zero => ("zero", 1),
        Repeat => ("repeat", 2),
        Mirror => ("mirror", 3),
    }
}

impl Default for BlendingMode {
    fn default() -> Self {
        BlendingMode::Over
    }
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::AspectFit
    }
}

impl Default for ExtendMode {
    fn default() -> Self {
        ExtendMode::Zero
    }
}

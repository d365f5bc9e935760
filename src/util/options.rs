use crate::util::constants::{MAX_BITS_PER_LEVEL, RTREE_BITS_PER_LEVEL};
use std::default::Default;

fn always_valid<T>(_: &T) -> bool {
    true
}

/// The prefix of environment variables that set options (such as `RTREE_BITS_PER_LEVEL`).
pub const ENV_PREFIX: &str = "RTREE_";

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Options for a tree.  Options only affect trees constructed with them, and never change
        /// over the lifetime of a tree.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// The default options, ignoring the environment.
            pub fn new() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Set an option by its name.  Return true if the option exists, and the value can
            /// be parsed and is valid.  Otherwise the option keeps its current value.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by the user) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}", s);
                        false
                    }
                }
            }

            /// The default options, overridden by environment variables.
            ///
            /// If we have env vars that start with `RTREE_` and match any option (such as
            /// `RTREE_BITS_PER_LEVEL`), we set the option to its value (if it is a valid value).
            /// Otherwise, use the default value.
            pub fn from_env() -> Self {
                let mut options = Self::new();
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(ENV_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    // The number of key bits consumed by each level but the last.  Wider levels make a shallower
    // tree with larger arrays.
    bits_per_level:      usize [|v: &usize| *v >= 1 && *v <= MAX_BITS_PER_LEVEL] = RTREE_BITS_PER_LEVEL,
    // Check that every array returned by the allocation hook is zero-filled before using it.
    // This costs a scan of each new array.
    verify_zeroed_nodes: bool  [always_valid] = cfg!(debug_assertions),
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

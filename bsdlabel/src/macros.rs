// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines the BSD filesystem-type table: one `u8` code constant per entry,
/// an enum over the known kinds, and the code/name conversions.
///
/// This macro generates:
/// - A constant `BSD_FS_<NAME>: u8` for each filesystem type.
/// - An enum `FsKind` with one variant per type and an `Unknown` variant
///   for unrecognized codes.
/// - `FsKind::from_code`, `FsKind::code` and `FsKind::name`.
/// - A `Display` implementation for `FsKind`.
///
/// # Note
/// This macro requires the `paste` crate for identifier concatenation.
macro_rules! define_fs_types {
    (
        $(
            $name:ident => $code:expr, $desc:expr
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                pub const [<BSD_FS_ $name:upper>]: u8 = $code;
            )+

            /// Filesystem-type tag of a disklabel partition.
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum FsKind {
                $($name,)+
                Unknown(u8),
            }

            impl FsKind {
                pub fn from_code(code: u8) -> Self {
                    match code {
                        $( [<BSD_FS_ $name:upper>] => Self::$name, )+
                        other => Self::Unknown(other),
                    }
                }

                pub fn code(&self) -> u8 {
                    match self {
                        $( Self::$name => [<BSD_FS_ $name:upper>], )+
                        Self::Unknown(code) => *code,
                    }
                }

                /// Display name from the base (non-Alpha) table.
                pub fn name(&self) -> &'static str {
                    match self {
                        $( Self::$name => $desc, )+
                        Self::Unknown(_) => "unknown",
                    }
                }
            }

            impl core::fmt::Display for FsKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        Self::Unknown(code) => write!(f, "unknown ({code:#x})"),
                        known => write!(f, "{}", known.name()),
                    }
                }
            }
        }
    };
}

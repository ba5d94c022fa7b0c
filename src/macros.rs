pub use enclose::*;

/// Builds a [`Cache`](crate::Cache) over a closure taking no arguments.
///
/// ```ignore
/// let total = memo!((price, qty) => price.get() * qty.get());
/// ```
#[macro_export]
macro_rules! memo {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Cache::new($crate::macros::enclose!(($( $d_tt )*) move |()| { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::Cache::new(move |()| { $($b)* })
    };
}

/// Builds a render operation closure returning `autotrack::Result<()>`.
#[macro_export]
macro_rules! render_op {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move || -> $crate::Result<()> { $($b)* })
    };
    (=> $($b:tt)*) => {
        move || -> $crate::Result<()> { $($b)* }
    };
}

/// Declares a struct of lazily initialized [`Tracked`](crate::Tracked)
/// fields, each with an accessor of the same name.
///
/// ```ignore
/// tracked_struct! {
///     pub struct Counter {
///         pub count: u32 = 0,
///         label: String = "clicks".to_owned(),
///     }
/// }
///
/// let counter = Counter::new();
/// counter.count().set(1)?;
/// ```
#[macro_export]
macro_rules! tracked_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $fvis:vis $field:ident : $ty:ty = $init:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $crate::Tracked<$ty>, )*
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    $( $field: $crate::tracked_with(move || -> $ty { $init }).activate(), )*
                }
            }

            $(
                #[allow(dead_code)]
                pub fn $field(&self) -> &$crate::Tracked<$ty> {
                    &self.$field
                }
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

//! Interned names.

use std::fmt;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

static INTERNER: LazyLock<RwLock<Rodeo>> = LazyLock::new(|| RwLock::new(Rodeo::default()));

/// Name of a class, function, field or variable.
///
/// Names are interned process-wide, so a `Symbol` is a 4-byte `Copy` key
/// and equality never touches the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    pub fn new(text: &'static str) -> Self {
        Self::intern_with(text, |rodeo| rodeo.get_or_intern_static(text))
    }

    /// Intern text built at runtime, such as synthesized temporary names.
    pub fn from_dynamic(text: &str) -> Self {
        Self::intern_with(text, |rodeo| rodeo.get_or_intern(text))
    }

    fn intern_with(text: &str, insert: impl FnOnce(&mut Rodeo) -> Spur) -> Self {
        let mut lock = INTERNER.upgradable_read();
        match lock.get(text) {
            Some(spur) => Symbol(spur),
            None => Symbol(lock.with_upgraded(insert)),
        }
    }

    /// Run `f` on the symbol's text.
    ///
    /// Takes a recursive read lock: `f` may format or compare other symbols.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let interner = INTERNER.read_recursive();
        f(interner.resolve(&self.0))
    }
}

impl From<&'static str> for Symbol {
    fn from(text: &'static str) -> Self {
        Symbol::new(text)
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.with_str(|s| s == *other)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

/// Declare functions returning fixed symbols.
///
/// ```
/// carrier_ir::symbols! {
///     BOX => "box",
/// }
/// assert_eq!(BOX(), "box");
/// ```
#[macro_export]
macro_rules! symbols {
    ($($(#[$attr:meta])* $name:ident => $text:literal),* $(,)?) => {
        $(
            $(#[$attr])*
            #[allow(non_snake_case)]
            #[inline]
            pub fn $name() -> $crate::Symbol {
                $crate::Symbol::new($text)
            }
        )*
    };
}

symbols! {
    /// Dispatch receiver of a member function, and a class's own `this`.
    THIS => "this",
    /// Extension receiver of a function.
    RECEIVER => "receiver",
    /// Every constructor.
    INIT => "<init>",
    IDENTITY_EQ => "identity_eq",
}

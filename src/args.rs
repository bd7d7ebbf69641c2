//! Variadic argument plumbing for the entry-point macro.
//!
//! `ic!` evaluates its arguments exactly once into a tuple and returns that
//! tuple unchanged; [`ArgList`] lets the pipeline borrow each element as a
//! `Debug` trait object without knowing the arity.

use std::fmt;

pub trait ArgList {
    fn debug_refs(&self) -> Vec<&dyn fmt::Debug>;
}

macro_rules! impl_arg_list {
    ($($t:ident . $idx:tt),+) => {
        impl<$($t: fmt::Debug),+> ArgList for ($($t,)+) {
            fn debug_refs(&self) -> Vec<&dyn fmt::Debug> {
                vec![$(&self.$idx as &dyn fmt::Debug),+]
            }
        }
    };
}

impl_arg_list!(A.0);
impl_arg_list!(A.0, B.1);
impl_arg_list!(A.0, B.1, C.2);
impl_arg_list!(A.0, B.1, C.2, D.3);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10);
impl_arg_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_preserve_order_and_count() {
        let tup = (1, "two", 3.0);
        let refs = tup.debug_refs();
        assert_eq!(refs.len(), 3);
        assert_eq!(format!("{:?}", refs[0]), "1");
        assert_eq!(format!("{:?}", refs[1]), "\"two\"");
        assert_eq!(format!("{:?}", refs[2]), "3.0");
    }
}

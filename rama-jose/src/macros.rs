//! hidden rama jose macros 🤫

pub(crate) use paste::paste;

/// Generate `with_*` (consuming) and `set_*` (borrowing) variants
/// of a builder method from a single definition.
macro_rules! generate_set_and_with {
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $param_name:ident: Option<$param_ty:ty> $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<maybe_with_ $fn_name>](mut $self_token, $param_name: Option<$param_ty>) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<maybe_set_ $fn_name>](&mut $self_token, $param_name: Option<$param_ty>) -> &mut Self {
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $param_name: $param_ty) -> Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $param_name: $param_ty) -> &mut Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<without_ $fn_name>](mut $self_token) -> Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<unset_ $fn_name>](&mut $self_token) -> &mut Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> &mut Self {
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Result<Self, $error:ty> {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            $vis fn [<try_with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Result<Self, $error> {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<try_set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> Result<&mut Self, $error> {
                $($body)*
            }
        }
    };
}

pub(crate) use generate_set_and_with;

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    #[derive(Debug, Default)]
    struct Options {
        pretty: bool,
        limit: Option<usize>,
        name: String,
    }

    impl Options {
        generate_set_and_with! {
            fn pretty(mut self, pretty: bool) -> Self {
                self.pretty = pretty;
                self
            }
        }

        generate_set_and_with! {
            fn limit(mut self, limit: Option<usize>) -> Self {
                self.limit = limit;
                self
            }
        }

        generate_set_and_with! {
            fn name(mut self, name: &str) -> Result<Self, String> {
                if name.is_empty() {
                    return Err("empty".to_owned());
                }
                self.name = name.to_owned();
                Ok(self)
            }
        }
    }

    #[test]
    fn test_generate_set_and_with() {
        let options = Options::default().with_pretty(true).with_limit(3);
        assert!(options.pretty);
        assert_eq!(options.limit, Some(3));

        let mut options = options.without_limit();
        assert_eq!(options.limit, None);
        options.set_pretty(false).maybe_set_limit(Some(7));
        assert!(!options.pretty);
        assert_eq!(options.limit, Some(7));
        options.unset_limit();
        assert_eq!(options.limit, None);

        let options = options.try_with_name("kid").unwrap();
        assert_eq!(options.name, "kid");
        let mut options = options;
        assert_err!(options.try_set_name(""));
        assert_eq!(options.name, "kid");
    }
}

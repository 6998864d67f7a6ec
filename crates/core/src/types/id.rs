//! Newtype IDs for backend records.
//!
//! Every record the REST backend hands out carries an integer id. The
//! `define_id!` macro wraps them so an `EmpresaId` can never be passed where a
//! `PedidoId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>`, `Into<i32>`, `Display` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use cardapio_core::define_id;
/// define_id!(MesaId);
/// define_id!(ComandaId);
///
/// let mesa = MesaId::new(1);
/// let comanda = ComandaId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: MesaId = comanda;
/// # let _ = (mesa, comanda);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(EmpresaId);
define_id!(UsuarioId);
define_id!(ProdutoId);
define_id!(AdicionalId);
define_id!(PedidoId);
define_id!(FuncionarioId);
define_id!(EnderecoId);
define_id!(AvisoId);
define_id!(CaixaId);
define_id!(MovimentacaoId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_trims_whitespace() {
        let id: ProdutoId = " 42 ".parse().unwrap();
        assert_eq!(id, ProdutoId::new(42));
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let json = serde_json::to_string(&PedidoId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: PedidoId = serde_json::from_str("7").unwrap();
        assert_eq!(back.as_i32(), 7);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("abc".parse::<EmpresaId>().is_err());
    }
}

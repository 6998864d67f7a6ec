//! Status and role enums shared by the menu and the back-office.
//!
//! Wire values are the lowercase snake_case strings the backend uses.

use serde::{Deserialize, Serialize};

/// Errors for order status transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderFlowError {
    /// The order is already in a terminal state.
    #[error("pedido já está {0}")]
    Terminal(PedidoStatus),
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PedidoStatus {
    #[default]
    Pendente,
    EmPreparo,
    Pronto,
    SaiuParaEntrega,
    Entregue,
    Cancelado,
}

impl PedidoStatus {
    /// Statuses shown on the kitchen board, in column order.
    pub const BOARD: [Self; 4] = [
        Self::Pendente,
        Self::EmPreparo,
        Self::Pronto,
        Self::SaiuParaEntrega,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pendente => "pendente",
            Self::EmPreparo => "em_preparo",
            Self::Pronto => "pronto",
            Self::SaiuParaEntrega => "saiu_para_entrega",
            Self::Entregue => "entregue",
            Self::Cancelado => "cancelado",
        }
    }

    /// Customer-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pendente => "Aguardando confirmação",
            Self::EmPreparo => "Em preparo",
            Self::Pronto => "Pronto",
            Self::SaiuParaEntrega => "Saiu para entrega",
            Self::Entregue => "Entregue",
            Self::Cancelado => "Cancelado",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Entregue | Self::Cancelado)
    }

    /// Next status in the flow for the given delivery type.
    ///
    /// Only delivery orders pass through `SaiuParaEntrega`; pickup and
    /// dine-in orders go from `Pronto` straight to `Entregue`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Terminal`] for delivered or cancelled orders.
    pub const fn next(&self, tipo: TipoEntrega) -> Result<Self, OrderFlowError> {
        match self {
            Self::Pendente => Ok(Self::EmPreparo),
            Self::EmPreparo => Ok(Self::Pronto),
            Self::Pronto => match tipo {
                TipoEntrega::Delivery => Ok(Self::SaiuParaEntrega),
                TipoEntrega::Retirada | TipoEntrega::Mesa => Ok(Self::Entregue),
            },
            Self::SaiuParaEntrega => Ok(Self::Entregue),
            Self::Entregue | Self::Cancelado => Err(OrderFlowError::Terminal(*self)),
        }
    }
}

impl std::fmt::Display for PedidoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PedidoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(Self::Pendente),
            "em_preparo" => Ok(Self::EmPreparo),
            "pronto" => Ok(Self::Pronto),
            "saiu_para_entrega" => Ok(Self::SaiuParaEntrega),
            "entregue" => Ok(Self::Entregue),
            "cancelado" => Ok(Self::Cancelado),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoEntrega {
    Delivery,
    Retirada,
    Mesa,
}

impl TipoEntrega {
    /// All delivery types, in the order the menu shows them.
    pub const ALL: [Self; 3] = [Self::Delivery, Self::Retirada, Self::Mesa];

    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Retirada => "retirada",
            Self::Mesa => "mesa",
        }
    }

    /// Customer-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Delivery => "Delivery",
            Self::Retirada => "Retirada",
            Self::Mesa => "Mesa",
        }
    }
}

impl std::fmt::Display for TipoEntrega {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TipoEntrega {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "retirada" => Ok(Self::Retirada),
            "mesa" => Ok(Self::Mesa),
            _ => Err(format!("invalid delivery type: {s}")),
        }
    }
}

/// Payment method chosen at checkout. Payment itself happens outside the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormaPagamento {
    #[default]
    Dinheiro,
    Pix,
    Cartao,
}

impl FormaPagamento {
    /// All payment methods.
    pub const ALL: [Self; 3] = [Self::Dinheiro, Self::Pix, Self::Cartao];

    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dinheiro => "dinheiro",
            Self::Pix => "pix",
            Self::Cartao => "cartao",
        }
    }

    /// Customer-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Dinheiro => "Dinheiro",
            Self::Pix => "Pix",
            Self::Cartao => "Cartão",
        }
    }
}

impl std::str::FromStr for FormaPagamento {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dinheiro" => Ok(Self::Dinheiro),
            "pix" => Ok(Self::Pix),
            "cartao" => Ok(Self::Cartao),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Cash register movement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovimentacaoTipo {
    /// Cash added to the drawer.
    Suprimento,
    /// Cash withdrawn from the drawer.
    Sangria,
}

impl MovimentacaoTipo {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Suprimento => "suprimento",
            Self::Sangria => "sangria",
        }
    }
}

impl std::str::FromStr for MovimentacaoTipo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suprimento" => Ok(Self::Suprimento),
            "sangria" => Ok(Self::Sangria),
            _ => Err(format!("invalid movement kind: {s}")),
        }
    }
}

/// Role attached to a back-office session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Provisions tenant companies. Not bound to a tenant.
    SuperAdmin,
    /// Tenant owner.
    Admin,
    /// Manages catalogue, staff and reports for a tenant.
    Gerente,
    /// Works the order board and the cash register.
    Funcionario,
}

impl UserRole {
    /// Roles an employee record can be given from the back-office.
    pub const STAFF: [Self; 3] = [Self::Admin, Self::Gerente, Self::Funcionario];

    /// Whether the role can edit catalogue, staff, settings and reports.
    #[must_use]
    pub const fn can_manage(&self) -> bool {
        matches!(self, Self::Admin | Self::Gerente)
    }

    /// Whether the role can operate tenant pages at all.
    #[must_use]
    pub const fn is_tenant_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Gerente | Self::Funcionario)
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super admin",
            Self::Admin => "Administrador",
            Self::Gerente => "Gerente",
            Self::Funcionario => "Funcionário",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Gerente => write!(f, "gerente"),
            Self::Funcionario => write!(f, "funcionario"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "gerente" => Ok(Self::Gerente),
            "funcionario" => Ok(Self::Funcionario),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_flow() {
        let mut status = PedidoStatus::Pendente;
        let mut seen = vec![status];
        while !status.is_terminal() {
            status = status.next(TipoEntrega::Delivery).unwrap();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                PedidoStatus::Pendente,
                PedidoStatus::EmPreparo,
                PedidoStatus::Pronto,
                PedidoStatus::SaiuParaEntrega,
                PedidoStatus::Entregue,
            ]
        );
    }

    #[test]
    fn test_pickup_skips_out_for_delivery() {
        assert_eq!(
            PedidoStatus::Pronto.next(TipoEntrega::Retirada).unwrap(),
            PedidoStatus::Entregue
        );
        assert_eq!(
            PedidoStatus::Pronto.next(TipoEntrega::Mesa).unwrap(),
            PedidoStatus::Entregue
        );
    }

    #[test]
    fn test_terminal_states_reject_next() {
        assert_eq!(
            PedidoStatus::Cancelado.next(TipoEntrega::Delivery),
            Err(OrderFlowError::Terminal(PedidoStatus::Cancelado))
        );
        assert!(PedidoStatus::Entregue.next(TipoEntrega::Mesa).is_err());
    }

    #[test]
    fn test_status_wire_values_roundtrip() {
        for status in [
            PedidoStatus::Pendente,
            PedidoStatus::EmPreparo,
            PedidoStatus::Pronto,
            PedidoStatus::SaiuParaEntrega,
            PedidoStatus::Entregue,
            PedidoStatus::Cancelado,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<PedidoStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Admin.can_manage());
        assert!(UserRole::Gerente.can_manage());
        assert!(!UserRole::Funcionario.can_manage());
        assert!(!UserRole::SuperAdmin.is_tenant_staff());
        assert_eq!("gerente".parse::<UserRole>().unwrap(), UserRole::Gerente);
        assert!("owner".parse::<UserRole>().is_err());
    }
}

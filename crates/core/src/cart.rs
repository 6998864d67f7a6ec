//! The customer's shopping cart.
//!
//! A cart is one tenant's list of configured product lines plus the chosen
//! delivery details. It is plain data: the storefront serializes it into the
//! customer's session after each mutation and rebuilds it on every request.
//!
//! Lines are merged by [`LineKey`]: the same product with the same (trimmed)
//! notes and the same set of add-ons is one line whose quantity grows.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Adicional, NovoPedido, NovoPedidoItem, Produto};
use crate::types::{AdicionalId, EmpresaId, FormaPagamento, Price, ProdutoId, TipoEntrega};

/// Identity of a cart line.
///
/// Add-on ids are kept sorted and deduplicated so selection order does not
/// matter. The string form is `produto:adicional.adicional:notes`, with the
/// notes last so they may contain any character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    produto_id: ProdutoId,
    adicionais: Vec<AdicionalId>,
    observacoes: String,
}

impl LineKey {
    #[must_use]
    pub fn new(produto_id: ProdutoId, observacoes: &str, adicionais: &[AdicionalId]) -> Self {
        let mut adicionais = adicionais.to_vec();
        adicionais.sort_unstable();
        adicionais.dedup();
        Self {
            produto_id,
            adicionais,
            observacoes: observacoes.trim().to_string(),
        }
    }

    #[must_use]
    pub const fn produto_id(&self) -> ProdutoId {
        self.produto_id
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.produto_id)?;
        for (i, id) in self.adicionais.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, ":{}", self.observacoes)
    }
}

/// Error parsing the string form of a [`LineKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("item do carrinho inválido: {0}")]
pub struct LineKeyError(String);

impl FromStr for LineKey {
    type Err = LineKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LineKeyError(s.to_string());
        let mut parts = s.splitn(3, ':');
        let produto = parts.next().ok_or_else(invalid)?;
        let adicionais = parts.next().ok_or_else(invalid)?;
        let observacoes = parts.next().ok_or_else(invalid)?;

        let produto_id: ProdutoId = produto.parse().map_err(|_| invalid())?;
        let adicionais = adicionais
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<AdicionalId>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(produto_id, observacoes, &adicionais))
    }
}

/// One configured product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub produto_id: ProdutoId,
    pub nome: String,
    /// Price at the moment the line was added.
    pub preco_unitario: Price,
    pub quantidade: u32,
    pub observacoes: String,
    pub adicionais: Vec<Adicional>,
}

impl CartItem {
    #[must_use]
    pub fn key(&self) -> LineKey {
        let ids: Vec<AdicionalId> = self.adicionais.iter().map(|a| a.id).collect();
        LineKey::new(self.produto_id, &self.observacoes, &ids)
    }

    /// Sum of the selected add-on prices for one unit.
    #[must_use]
    pub fn preco_adicionais(&self) -> Price {
        self.adicionais.iter().map(|a| a.preco).sum()
    }

    /// `(unit price + add-ons) × quantity`.
    #[must_use]
    pub fn total(&self) -> Price {
        (self.preco_unitario + self.preco_adicionais()) * self.quantidade
    }
}

/// Delivery choices made on the cart page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub tipo: Option<TipoEntrega>,
    pub mesa: Option<String>,
    pub observacoes: String,
}

/// Customer data collected by the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClienteInfo {
    pub nome: String,
    pub telefone: String,
    pub endereco: String,
    pub bairro: String,
    pub forma_pagamento: FormaPagamento,
    pub troco_para: Option<Price>,
    /// Fee for the chosen neighbourhood, resolved by the caller.
    pub taxa_entrega: Price,
}

/// Why a cart cannot become an order yet.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Seu carrinho está vazio")]
    EmptyCart,
    #[error("Escolha como deseja receber o pedido")]
    MissingDeliveryType,
    #[error("Informe seu nome")]
    MissingName,
    #[error("Informe seu telefone")]
    MissingPhone,
    #[error("Informe o endereço de entrega")]
    MissingAddress,
    #[error("Informe o bairro")]
    MissingNeighbourhood,
    #[error("Informe o número da mesa")]
    MissingTable,
}

/// A tenant's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrinho {
    #[serde(default)]
    pub itens: Vec<CartItem>,
    #[serde(default)]
    pub entrega: DeliveryDetails,
}

impl Carrinho {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.itens.is_empty()
    }

    #[must_use]
    pub fn item(&self, key: &LineKey) -> Option<&CartItem> {
        self.itens.iter().find(|item| &item.key() == key)
    }

    /// Add `quantidade` units of a configured product.
    ///
    /// Merges into an existing line with the same key; otherwise appends a
    /// line priced at the product's current price. Add-ons selected twice
    /// count once. Returns the line's key, or `None` when `quantidade` is 0.
    pub fn adicionar_item(
        &mut self,
        produto: &Produto,
        quantidade: u32,
        observacoes: &str,
        adicionais: &[Adicional],
    ) -> Option<LineKey> {
        if quantidade == 0 {
            return None;
        }

        let mut selecionados: Vec<Adicional> = Vec::with_capacity(adicionais.len());
        for adicional in adicionais {
            if !selecionados.iter().any(|a| a.id == adicional.id) {
                selecionados.push(adicional.clone());
            }
        }
        let ids: Vec<AdicionalId> = selecionados.iter().map(|a| a.id).collect();
        let key = LineKey::new(produto.id, observacoes, &ids);

        if let Some(item) = self.itens.iter_mut().find(|item| item.key() == key) {
            item.quantidade = item.quantidade.saturating_add(quantidade);
        } else {
            self.itens.push(CartItem {
                produto_id: produto.id,
                nome: produto.nome.clone(),
                preco_unitario: produto.preco_vigente(),
                quantidade,
                observacoes: observacoes.trim().to_string(),
                adicionais: selecionados,
            });
        }
        Some(key)
    }

    /// Remove the line with this key, if present.
    pub fn remover_item(&mut self, key: &LineKey) {
        self.itens.retain(|item| &item.key() != key);
    }

    /// Set a line's quantity; zero or less removes the line.
    pub fn atualizar_quantidade(&mut self, key: &LineKey, nova_quantidade: i64) {
        if nova_quantidade <= 0 {
            self.remover_item(key);
            return;
        }
        let quantidade = u32::try_from(nova_quantidade).unwrap_or(u32::MAX);
        if let Some(item) = self.itens.iter_mut().find(|item| &item.key() == key) {
            item.quantidade = quantidade;
        }
    }

    /// Empty the cart and reset the delivery details.
    pub fn limpar(&mut self) {
        self.itens.clear();
        self.entrega = DeliveryDetails::default();
    }

    #[must_use]
    pub fn calcular_total(&self) -> Price {
        self.itens.iter().map(CartItem::total).sum()
    }

    #[must_use]
    pub fn calcular_quantidade_total(&self) -> u32 {
        self.itens
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantidade))
    }

    /// Record how the order will be received.
    ///
    /// Blank table numbers are stored as `None`; the table is dropped for
    /// types other than dine-in.
    pub fn definir_entrega(&mut self, tipo: TipoEntrega, mesa: Option<&str>, observacoes: &str) {
        let mesa = match tipo {
            TipoEntrega::Mesa => mesa
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            TipoEntrega::Delivery | TipoEntrega::Retirada => None,
        };
        self.entrega = DeliveryDetails {
            tipo: Some(tipo),
            mesa,
            observacoes: observacoes.trim().to_string(),
        };
    }

    /// Change the order notes and keep the delivery type chosen so far.
    pub fn definir_observacoes(&mut self, observacoes: &str) {
        self.entrega.observacoes = observacoes.trim().to_string();
    }

    /// Build the order creation payload.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when the cart is empty, no delivery type
    /// was chosen, or a field required by that type is blank.
    pub fn to_novo_pedido(
        &self,
        empresa_id: EmpresaId,
        cliente: &ClienteInfo,
    ) -> Result<NovoPedido, CheckoutError> {
        if self.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let tipo = self.entrega.tipo.ok_or(CheckoutError::MissingDeliveryType)?;

        let nome = required(&cliente.nome, CheckoutError::MissingName)?;
        let telefone = cliente.telefone.trim();
        let (endereco, bairro, mesa) = match tipo {
            TipoEntrega::Delivery => {
                required(telefone, CheckoutError::MissingPhone)?;
                let endereco = required(&cliente.endereco, CheckoutError::MissingAddress)?;
                let bairro = required(&cliente.bairro, CheckoutError::MissingNeighbourhood)?;
                (Some(endereco), Some(bairro), None)
            }
            TipoEntrega::Retirada => {
                required(telefone, CheckoutError::MissingPhone)?;
                (None, None, None)
            }
            TipoEntrega::Mesa => {
                let mesa = self
                    .entrega
                    .mesa
                    .as_deref()
                    .ok_or(CheckoutError::MissingTable)?;
                (None, None, Some(required(mesa, CheckoutError::MissingTable)?))
            }
        };

        let subtotal = self.calcular_total();
        let taxa_entrega = if tipo == TipoEntrega::Delivery {
            cliente.taxa_entrega
        } else {
            Price::ZERO
        };
        let troco_para = match cliente.forma_pagamento {
            FormaPagamento::Dinheiro => cliente.troco_para.filter(|t| !t.is_zero()),
            FormaPagamento::Pix | FormaPagamento::Cartao => None,
        };

        Ok(NovoPedido {
            empresa_id,
            cliente_nome: nome,
            cliente_telefone: telefone.to_string(),
            tipo_entrega: tipo,
            mesa,
            endereco,
            bairro,
            observacoes: self.entrega.observacoes.clone(),
            forma_pagamento: cliente.forma_pagamento,
            troco_para,
            itens: self
                .itens
                .iter()
                .map(|item| NovoPedidoItem {
                    produto_id: item.produto_id,
                    quantidade: item.quantidade,
                    preco_unitario: item.preco_unitario,
                    observacoes: item.observacoes.clone(),
                    adicionais: item.adicionais.iter().map(|a| a.id).collect(),
                })
                .collect(),
            subtotal,
            taxa_entrega,
            total: subtotal + taxa_entrega,
        })
    }
}

fn required(value: &str, err: CheckoutError) -> Result<String, CheckoutError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn produto(id: i32, cents: i64) -> Produto {
        Produto {
            id: ProdutoId::new(id),
            empresa_id: EmpresaId::new(1),
            categoria: "Lanches".to_string(),
            nome: format!("Produto {id}"),
            descricao: None,
            preco: Price::from_cents(cents),
            em_promocao: false,
            preco_promocional: None,
            disponivel: true,
            imagem_url: None,
            adicionais: vec![adicional(1, 200), adicional(2, 350)],
        }
    }

    fn adicional(id: i32, cents: i64) -> Adicional {
        Adicional {
            id: AdicionalId::new(id),
            nome: format!("Adicional {id}"),
            preco: Price::from_cents(cents),
        }
    }

    fn cliente() -> ClienteInfo {
        ClienteInfo {
            nome: "Ana".to_string(),
            telefone: "(31) 99999-0000".to_string(),
            endereco: "Rua A, 10".to_string(),
            bairro: "Centro".to_string(),
            taxa_entrega: Price::from_cents(500),
            ..ClienteInfo::default()
        }
    }

    // =========================================================================
    // Line merging
    // =========================================================================

    #[test]
    fn test_same_product_and_notes_accumulates() {
        let mut cart = Carrinho::new();
        let p = produto(1, 1000);
        cart.adicionar_item(&p, 1, "sem cebola", &[]);
        cart.adicionar_item(&p, 2, "  sem cebola ", &[]);
        assert_eq!(cart.itens.len(), 1);
        assert_eq!(cart.itens.first().unwrap().quantidade, 3);
    }

    #[test]
    fn test_different_notes_make_separate_lines() {
        let mut cart = Carrinho::new();
        let a = produto(1, 1000);
        cart.adicionar_item(&a, 2, "", &[]);
        cart.adicionar_item(&a, 1, "sem cebola", &[]);
        assert_eq!(cart.itens.len(), 2);
        assert_eq!(cart.calcular_total(), Price::from_cents(3000));
        assert_eq!(cart.calcular_quantidade_total(), 3);
    }

    #[test]
    fn test_addon_order_does_not_affect_identity() {
        let mut cart = Carrinho::new();
        let p = produto(1, 1000);
        cart.adicionar_item(&p, 1, "", &[adicional(1, 200), adicional(2, 350)]);
        cart.adicionar_item(&p, 1, "", &[adicional(2, 350), adicional(1, 200)]);
        assert_eq!(cart.itens.len(), 1);
        // (10.00 + 2.00 + 3.50) × 2
        assert_eq!(cart.calcular_total(), Price::from_cents(3100));
    }

    #[test]
    fn test_duplicate_addon_counts_once() {
        let mut cart = Carrinho::new();
        let p = produto(1, 1000);
        cart.adicionar_item(&p, 1, "", &[adicional(1, 200), adicional(1, 200)]);
        assert_eq!(cart.itens.first().unwrap().adicionais.len(), 1);
        assert_eq!(cart.calcular_total(), Price::from_cents(1200));
    }

    #[test]
    fn test_zero_quantity_is_noop() {
        let mut cart = Carrinho::new();
        assert!(cart.adicionar_item(&produto(1, 1000), 0, "", &[]).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_promotion_price_is_snapshotted() {
        let mut cart = Carrinho::new();
        let mut p = produto(1, 1000);
        p.em_promocao = true;
        p.preco_promocional = Some(Price::from_cents(750));
        cart.adicionar_item(&p, 2, "", &[]);

        // Ending the promotion later does not reprice the existing line.
        p.em_promocao = false;
        cart.adicionar_item(&p, 1, "extra", &[]);

        assert_eq!(cart.itens.first().unwrap().preco_unitario, Price::from_cents(750));
        assert_eq!(cart.calcular_total(), Price::from_cents(2500));
    }

    // =========================================================================
    // Quantity changes and clearing
    // =========================================================================

    #[test]
    fn test_quantity_zero_or_negative_removes_line() {
        let mut cart = Carrinho::new();
        let key = cart.adicionar_item(&produto(1, 1000), 2, "", &[]).unwrap();
        cart.atualizar_quantidade(&key, 5);
        assert_eq!(cart.item(&key).unwrap().quantidade, 5);
        cart.atualizar_quantidade(&key, 0);
        assert!(cart.is_empty());

        let key = cart.adicionar_item(&produto(1, 1000), 2, "", &[]).unwrap();
        cart.atualizar_quantidade(&key, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remover_item_only_removes_matching_line() {
        let mut cart = Carrinho::new();
        let p = produto(1, 1000);
        let plain = cart.adicionar_item(&p, 1, "", &[]).unwrap();
        cart.adicionar_item(&p, 1, "bem passado", &[]);
        cart.remover_item(&plain);
        assert_eq!(cart.itens.len(), 1);
        assert_eq!(cart.itens.first().unwrap().observacoes, "bem passado");
    }

    #[test]
    fn test_limpar_resets_items_and_delivery() {
        let mut cart = Carrinho::new();
        cart.adicionar_item(&produto(1, 1000), 1, "", &[]);
        cart.definir_entrega(TipoEntrega::Mesa, Some("12"), "perto da janela");
        cart.limpar();
        assert!(cart.is_empty());
        assert_eq!(cart.entrega, DeliveryDetails::default());
        assert_eq!(cart.calcular_total(), Price::ZERO);
    }

    #[test]
    fn test_table_is_dropped_for_other_types() {
        let mut cart = Carrinho::new();
        cart.definir_entrega(TipoEntrega::Retirada, Some("12"), "");
        assert_eq!(cart.entrega.mesa, None);
        cart.definir_entrega(TipoEntrega::Mesa, Some("  "), "");
        assert_eq!(cart.entrega.mesa, None);
    }

    #[test]
    fn test_notes_can_be_set_before_or_after_type() {
        let mut cart = Carrinho::new();
        cart.definir_observacoes(" sem troco ");
        assert_eq!(cart.entrega.tipo, None);
        assert_eq!(cart.entrega.observacoes, "sem troco");

        cart.definir_entrega(TipoEntrega::Mesa, Some("4"), "sem troco");
        cart.definir_observacoes("trazer talheres");
        assert_eq!(cart.entrega.tipo, Some(TipoEntrega::Mesa));
        assert_eq!(cart.entrega.mesa.as_deref(), Some("4"));
        assert_eq!(cart.entrega.observacoes, "trazer talheres");
    }

    // =========================================================================
    // Line keys
    // =========================================================================

    #[test]
    fn test_line_key_string_form() {
        let key = LineKey::new(
            ProdutoId::new(7),
            " sem: cebola ",
            &[AdicionalId::new(3), AdicionalId::new(1)],
        );
        assert_eq!(key.to_string(), "7:1.3:sem: cebola");
        assert_eq!("7:1.3:sem: cebola".parse::<LineKey>().unwrap(), key);
        assert_eq!("7::".parse::<LineKey>().unwrap(), LineKey::new(ProdutoId::new(7), "", &[]));
        assert!("x:1:".parse::<LineKey>().is_err());
        assert!("7".parse::<LineKey>().is_err());
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    #[test]
    fn test_checkout_requires_items_and_type() {
        let mut cart = Carrinho::new();
        let empresa = EmpresaId::new(1);
        assert_eq!(cart.to_novo_pedido(empresa, &cliente()), Err(CheckoutError::EmptyCart));
        cart.adicionar_item(&produto(1, 1000), 1, "", &[]);
        assert_eq!(
            cart.to_novo_pedido(empresa, &cliente()),
            Err(CheckoutError::MissingDeliveryType)
        );
    }

    #[test]
    fn test_checkout_required_fields_per_type() {
        let empresa = EmpresaId::new(1);
        let mut cart = Carrinho::new();
        cart.adicionar_item(&produto(1, 1000), 1, "", &[]);

        cart.definir_entrega(TipoEntrega::Delivery, None, "");
        let sem_bairro = ClienteInfo {
            bairro: " ".to_string(),
            ..cliente()
        };
        assert_eq!(
            cart.to_novo_pedido(empresa, &sem_bairro),
            Err(CheckoutError::MissingNeighbourhood)
        );

        cart.definir_entrega(TipoEntrega::Retirada, None, "");
        let sem_telefone = ClienteInfo {
            telefone: String::new(),
            ..cliente()
        };
        assert_eq!(
            cart.to_novo_pedido(empresa, &sem_telefone),
            Err(CheckoutError::MissingPhone)
        );

        cart.definir_entrega(TipoEntrega::Mesa, None, "");
        assert_eq!(
            cart.to_novo_pedido(empresa, &sem_telefone),
            Err(CheckoutError::MissingTable)
        );
        cart.definir_entrega(TipoEntrega::Mesa, Some("4"), "");
        let pedido = cart.to_novo_pedido(empresa, &sem_telefone).unwrap();
        assert_eq!(pedido.mesa.as_deref(), Some("4"));

        let sem_nome = ClienteInfo {
            nome: String::new(),
            ..cliente()
        };
        assert_eq!(cart.to_novo_pedido(empresa, &sem_nome), Err(CheckoutError::MissingName));
    }

    #[test]
    fn test_delivery_fee_only_applies_to_delivery() {
        let empresa = EmpresaId::new(1);
        let mut cart = Carrinho::new();
        cart.adicionar_item(&produto(1, 1000), 2, "", &[adicional(1, 200)]);

        cart.definir_entrega(TipoEntrega::Delivery, None, "tocar interfone");
        let pedido = cart.to_novo_pedido(empresa, &cliente()).unwrap();
        assert_eq!(pedido.subtotal, Price::from_cents(2400));
        assert_eq!(pedido.taxa_entrega, Price::from_cents(500));
        assert_eq!(pedido.total, Price::from_cents(2900));
        assert_eq!(pedido.observacoes, "tocar interfone");
        assert_eq!(pedido.itens.first().unwrap().adicionais, vec![AdicionalId::new(1)]);

        cart.definir_entrega(TipoEntrega::Retirada, None, "");
        let pedido = cart.to_novo_pedido(empresa, &cliente()).unwrap();
        assert_eq!(pedido.taxa_entrega, Price::ZERO);
        assert_eq!(pedido.total, Price::from_cents(2400));
        assert_eq!(pedido.endereco, None);
    }

    #[test]
    fn test_change_only_kept_for_cash() {
        let empresa = EmpresaId::new(1);
        let mut cart = Carrinho::new();
        cart.adicionar_item(&produto(1, 1000), 1, "", &[]);
        cart.definir_entrega(TipoEntrega::Retirada, None, "");

        let pix = ClienteInfo {
            forma_pagamento: FormaPagamento::Pix,
            troco_para: Some(Price::from_cents(5000)),
            ..cliente()
        };
        assert_eq!(cart.to_novo_pedido(empresa, &pix).unwrap().troco_para, None);

        let dinheiro = ClienteInfo {
            forma_pagamento: FormaPagamento::Dinheiro,
            ..pix
        };
        assert_eq!(
            cart.to_novo_pedido(empresa, &dinheiro).unwrap().troco_para,
            Some(Price::from_cents(5000))
        );
    }

    #[test]
    fn test_session_roundtrip_preserves_lines() {
        let mut cart = Carrinho::new();
        cart.adicionar_item(&produto(1, 1000), 2, "sem cebola", &[adicional(2, 350)]);
        cart.definir_entrega(TipoEntrega::Mesa, Some("3"), "");
        let json = serde_json::to_value(&cart).unwrap();
        let back: Carrinho = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}

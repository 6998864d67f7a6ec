//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Each restaurant's cart lives in the session under its own key, so
//! browsing two menus keeps two carts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{AppendHeaders, IntoResponse, Response},
};
use cardapio_core::{AdicionalId, Carrinho, CartItem, LineKey, OrderGate, ProdutoId, TipoEntrega};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::menu::{EmpresaView, GateView, find_produto};
use super::{TenantContext, load_tenant};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CspNonce, load_carrinho, save_carrinho, take_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Header telling the page to refresh cart badges.
const CART_UPDATED: [(&str, &str); 1] = [("HX-Trigger", "cart-updated")];

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    /// String form of the line key, posted back by the line's forms.
    pub key: String,
    pub nome: String,
    pub quantidade: u32,
    pub preco_unitario: String,
    pub adicionais: Vec<String>,
    pub observacoes: Option<String>,
    pub total: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            key: item.key().to_string(),
            nome: item.nome.clone(),
            quantidade: item.quantidade,
            preco_unitario: (item.preco_unitario + item.preco_adicionais()).display(),
            adicionais: item
                .adicionais
                .iter()
                .map(|a| format!("{} (+{})", a.nome, a.preco.display()))
                .collect(),
            observacoes: Some(item.observacoes.clone()).filter(|o| !o.is_empty()),
            total: item.total().display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    /// Selected delivery type wire value.
    pub tipo: Option<&'static str>,
    pub mesa: String,
    pub observacoes: String,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `value` is the selected delivery type.
    #[must_use]
    pub fn tipo_selecionado(&self, value: &str) -> bool {
        self.tipo == Some(value)
    }
}

impl From<&Carrinho> for CartView {
    fn from(carrinho: &Carrinho) -> Self {
        Self {
            items: carrinho.itens.iter().map(CartItemView::from).collect(),
            subtotal: carrinho.calcular_total().display(),
            item_count: carrinho.calcular_quantidade_total(),
            tipo: carrinho.entrega.tipo.map(|t| t.as_str()),
            mesa: carrinho.entrega.mesa.clone().unwrap_or_default(),
            observacoes: carrinho.entrega.observacoes.clone(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
///
/// Decoded from raw pairs because the add-on checkboxes repeat the
/// `adicional` key.
#[derive(Debug, PartialEq, Eq)]
pub struct AddToCartForm {
    pub produto_id: ProdutoId,
    pub quantidade: u32,
    pub observacoes: String,
    pub adicionais: Vec<AdicionalId>,
}

impl AddToCartForm {
    /// Build the form from decoded `application/x-www-form-urlencoded` pairs.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the product is missing or a number is
    /// malformed.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self> {
        let mut produto_id = None;
        let mut quantidade = 1;
        let mut observacoes = String::new();
        let mut adicionais = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "produto_id" => {
                    produto_id = Some(value.trim().parse::<ProdutoId>().map_err(|_| {
                        AppError::BadRequest("Produto inválido".to_string())
                    })?);
                }
                "quantidade" if !value.trim().is_empty() => {
                    quantidade = value.trim().parse::<u32>().map_err(|_| {
                        AppError::BadRequest("Quantidade inválida".to_string())
                    })?;
                }
                "observacoes" => observacoes = value,
                "adicional" => adicionais.push(value.trim().parse::<AdicionalId>().map_err(
                    |_| AppError::BadRequest("Adicional inválido".to_string()),
                )?),
                _ => {}
            }
        }

        Ok(Self {
            produto_id: produto_id
                .ok_or_else(|| AppError::BadRequest("Produto não informado".to_string()))?,
            quantidade,
            observacoes,
            adicionais,
        })
    }
}

/// Update cart line form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item: String,
    pub quantidade: i64,
}

/// Remove cart line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item: String,
}

/// Delivery choice form data. A blank `tipo` only updates the notes.
#[derive(Debug, Deserialize)]
pub struct DeliveryForm {
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub mesa: Option<String>,
    #[serde(default)]
    pub observacoes: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nonce: String,
    pub flash: Option<Flash>,
    pub empresa: EmpresaView,
    pub gate: GateView,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub slug: String,
    pub gate: GateView,
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub slug: String,
    pub count: u32,
    pub total: String,
}

impl CartCountTemplate {
    fn new(slug: &str, carrinho: &Carrinho) -> Self {
        Self {
            slug: slug.to_string(),
            count: carrinho.calcular_quantidade_total(),
            total: carrinho.calcular_total().display(),
        }
    }
}

/// A closed menu still lets lines shrink or go away, never grow.
fn check_quantity_change(
    carrinho: &Carrinho,
    key: &LineKey,
    nova_quantidade: i64,
    gate: &OrderGate,
) -> Result<()> {
    let atual = carrinho.item(key).map_or(0, |item| i64::from(item.quantidade));
    if !gate.pode_adicionar && nova_quantidade > atual {
        return Err(AppError::Unavailable(
            gate.motivo.unwrap_or_default().to_string(),
        ));
    }
    Ok(())
}

fn parse_line_key(raw: &str) -> Result<LineKey> {
    raw.parse::<LineKey>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(slug): Path<String>,
) -> Result<CartShowTemplate> {
    let TenantContext { slug, empresa, gate } = load_tenant(&state, &slug).await?;
    let carrinho = load_carrinho(&session, &slug).await;

    Ok(CartShowTemplate {
        nonce,
        flash: take_flash(&session).await,
        empresa: EmpresaView::from(&empresa),
        gate: GateView::from(&gate),
        cart: CartView::from(&carrinho),
    })
}

/// Add item to cart (HTMX).
///
/// Returns the refreshed cart badge with an HTMX trigger so other cart
/// widgets on the page update too.
#[instrument(skip(state, session, pairs))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = AddToCartForm::from_pairs(pairs)?;
    let TenantContext { slug, gate, .. } = load_tenant(&state, &slug).await?;
    if !gate.pode_adicionar {
        return Err(AppError::Unavailable(
            gate.motivo.unwrap_or_default().to_string(),
        ));
    }

    let produto = find_produto(&state, slug.as_str(), form.produto_id).await?;
    let adicionais = form
        .adicionais
        .iter()
        .map(|id| {
            produto
                .adicional(*id)
                .cloned()
                .ok_or_else(|| AppError::BadRequest(format!("Adicional {id} não pertence ao produto")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut carrinho = load_carrinho(&session, &slug).await;
    carrinho
        .adicionar_item(&produto, form.quantidade, &form.observacoes, &adicionais)
        .ok_or_else(|| AppError::BadRequest("Quantidade inválida".to_string()))?;
    save_carrinho(&session, &slug, &carrinho).await?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("produto_id", &produto.id.to_string())]),
    );

    Ok((
        AppendHeaders(CART_UPDATED),
        CartCountTemplate::new(slug.as_str(), &carrinho),
    )
        .into_response())
}

/// Update cart line quantity (HTMX). Zero or less removes the line.
///
/// Increases are refused while the menu is not taking orders.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let key = parse_line_key(&form.item)?;
    mutate(&state, &session, &slug, |carrinho, gate| {
        check_quantity_change(carrinho, &key, form.quantidade, gate)?;
        carrinho.atualizar_quantidade(&key, form.quantidade);
        Ok(())
    })
    .await
}

/// Remove cart line (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let key = parse_line_key(&form.item)?;
    mutate(&state, &session, &slug, |carrinho, _| {
        carrinho.remover_item(&key);
        Ok(())
    })
    .await
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response> {
    mutate(&state, &session, &slug, |carrinho, _| {
        carrinho.limpar();
        Ok(())
    })
    .await
}

/// Record the delivery choice (HTMX).
#[instrument(skip(state, session))]
pub async fn delivery(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<DeliveryForm>,
) -> Result<Response> {
    let tipo = match form.tipo.trim() {
        "" => None,
        raw => Some(
            raw.parse::<TipoEntrega>()
                .map_err(|_| AppError::BadRequest("Tipo de entrega inválido".to_string()))?,
        ),
    };

    mutate(&state, &session, &slug, |carrinho, gate| {
        let Some(tipo) = tipo else {
            carrinho.definir_observacoes(&form.observacoes);
            return Ok(());
        };
        if !gate.permite(tipo) {
            return Err(AppError::Unavailable(format!(
                "{} indisponível no momento",
                tipo.label()
            )));
        }
        carrinho.definir_entrega(tipo, form.mesa.as_deref(), &form.observacoes);
        Ok(())
    })
    .await
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session, Path(slug): Path<String>) -> Result<CartCountTemplate> {
    let slug = super::parse_slug(&slug)?;
    let carrinho = load_carrinho(&session, &slug).await;
    Ok(CartCountTemplate::new(slug.as_str(), &carrinho))
}

/// Load, change and save a cart, answering with the items fragment.
async fn mutate<F>(state: &AppState, session: &Session, slug: &str, change: F) -> Result<Response>
where
    F: FnOnce(&mut Carrinho, &OrderGate) -> Result<()>,
{
    let TenantContext { slug, gate, .. } = load_tenant(state, slug).await?;
    let mut carrinho = load_carrinho(session, &slug).await;
    change(&mut carrinho, &gate)?;
    save_carrinho(session, &slug, &carrinho).await?;

    Ok((
        AppendHeaders(CART_UPDATED),
        CartItemsTemplate {
            slug: slug.into_inner(),
            gate: GateView::from(&gate),
            cart: CartView::from(&carrinho),
        },
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::models::{Adicional, Produto};
    use cardapio_core::{EmpresaId, Price};

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    // =========================================================================
    // AddToCartForm Tests
    // =========================================================================

    #[test]
    fn test_add_form_collects_repeated_addons() {
        let form = AddToCartForm::from_pairs(pairs(&[
            ("produto_id", "7"),
            ("quantidade", "2"),
            ("observacoes", "sem cebola"),
            ("adicional", "3"),
            ("adicional", "1"),
        ]))
        .unwrap();

        assert_eq!(form.produto_id, ProdutoId::new(7));
        assert_eq!(form.quantidade, 2);
        assert_eq!(form.observacoes, "sem cebola");
        assert_eq!(form.adicionais, vec![AdicionalId::new(3), AdicionalId::new(1)]);
    }

    #[test]
    fn test_add_form_defaults_quantity_to_one() {
        let form =
            AddToCartForm::from_pairs(pairs(&[("produto_id", "7"), ("quantidade", "")])).unwrap();
        assert_eq!(form.quantidade, 1);
        assert!(form.adicionais.is_empty());
    }

    #[test]
    fn test_add_form_rejects_missing_or_malformed_fields() {
        assert!(matches!(
            AddToCartForm::from_pairs(pairs(&[("quantidade", "1")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            AddToCartForm::from_pairs(pairs(&[("produto_id", "sete")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            AddToCartForm::from_pairs(pairs(&[("produto_id", "7"), ("adicional", "x")])),
            Err(AppError::BadRequest(_))
        ));
    }

    // =========================================================================
    // CartView Tests
    // =========================================================================

    #[test]
    fn test_cart_view_prices_lines_with_addons() {
        let produto = Produto {
            id: ProdutoId::new(7),
            empresa_id: EmpresaId::new(1),
            categoria: "Lanches".to_string(),
            nome: "X-Burguer".to_string(),
            descricao: None,
            preco: Price::from_cents(2000),
            em_promocao: false,
            preco_promocional: None,
            disponivel: true,
            imagem_url: None,
            adicionais: vec![],
        };
        let bacon = Adicional {
            id: AdicionalId::new(1),
            nome: "Bacon".to_string(),
            preco: Price::from_cents(500),
        };
        let mut carrinho = Carrinho::new();
        let key = carrinho
            .adicionar_item(&produto, 2, " bem passado ", &[bacon])
            .unwrap();
        carrinho.definir_entrega(TipoEntrega::Retirada, None, "");

        let view = CartView::from(&carrinho);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "R$ 50,00");
        assert!(view.tipo_selecionado("retirada"));
        assert!(!view.tipo_selecionado("delivery"));

        let line = &view.items[0];
        assert_eq!(line.key, key.to_string());
        assert_eq!(line.preco_unitario, "R$ 25,00");
        assert_eq!(line.adicionais, vec!["Bacon (+R$ 5,00)".to_string()]);
        assert_eq!(line.observacoes.as_deref(), Some("bem passado"));
        assert_eq!(parse_line_key(&line.key).unwrap(), key);
    }

    // =========================================================================
    // Quantity Gate Tests
    // =========================================================================

    fn closed_gate() -> OrderGate {
        OrderGate {
            pode_adicionar: false,
            pode_finalizar: false,
            entrega_habilitada: false,
            retirada_habilitada: false,
            mesa_habilitada: false,
            motivo: Some(cardapio_core::gate::MOTIVO_ONLINE_DESATIVADO),
        }
    }

    #[test]
    fn test_closed_menu_only_lets_lines_shrink() {
        let produto = Produto {
            id: ProdutoId::new(7),
            empresa_id: EmpresaId::new(1),
            categoria: "Lanches".to_string(),
            nome: "X-Burguer".to_string(),
            descricao: None,
            preco: Price::from_cents(2000),
            em_promocao: false,
            preco_promocional: None,
            disponivel: true,
            imagem_url: None,
            adicionais: vec![],
        };
        let mut carrinho = Carrinho::new();
        let key = carrinho.adicionar_item(&produto, 2, "", &[]).unwrap();
        let gate = closed_gate();

        assert!(matches!(
            check_quantity_change(&carrinho, &key, 3, &gate),
            Err(AppError::Unavailable(ref motivo)) if motivo == cardapio_core::gate::MOTIVO_ONLINE_DESATIVADO
        ));
        assert!(check_quantity_change(&carrinho, &key, 2, &gate).is_ok());
        assert!(check_quantity_change(&carrinho, &key, 1, &gate).is_ok());
        assert!(check_quantity_change(&carrinho, &key, 0, &gate).is_ok());

        let open = OrderGate {
            pode_adicionar: true,
            motivo: None,
            ..gate
        };
        assert!(check_quantity_change(&carrinho, &key, 99, &open).is_ok());
    }

    #[test]
    fn test_parse_line_key_rejects_garbage() {
        assert!(matches!(parse_line_key("nope"), Err(AppError::BadRequest(_))));
    }
}

//! Cash register route handlers.
//!
//! Every action posts a small form, pushes a toast and redirects back to
//! the register page, which always shows the backend's current session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use cardapio_core::MovimentacaoTipo;
use cardapio_core::models::{Caixa, Movimentacao, MovimentacaoInput};
use chrono::FixedOffset;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::{optional, parse_price};
use super::{PageContext, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireStaff, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

#[derive(Clone, Debug)]
pub struct MovimentacaoView {
    pub tipo: &'static str,
    pub saida: bool,
    pub valor: String,
    pub descricao: String,
    pub hora: String,
}

impl MovimentacaoView {
    fn new(mov: &Movimentacao, offset: FixedOffset) -> Self {
        Self {
            tipo: match mov.tipo {
                MovimentacaoTipo::Suprimento => "Suprimento",
                MovimentacaoTipo::Sangria => "Sangria",
            },
            saida: mov.tipo == MovimentacaoTipo::Sangria,
            valor: mov.valor.display(),
            descricao: mov.descricao.clone(),
            hora: mov.criado_em.with_timezone(&offset).format("%H:%M").to_string(),
        }
    }
}

/// The open session with its running totals.
#[derive(Clone, Debug)]
pub struct CaixaView {
    pub aberto_em: String,
    pub valor_abertura: String,
    pub vendas_dinheiro: String,
    pub suprimentos: String,
    pub sangrias: String,
    pub saldo_esperado: String,
    pub movimentacoes: Vec<MovimentacaoView>,
}

impl CaixaView {
    #[must_use]
    pub fn new(caixa: &Caixa, offset: FixedOffset) -> Self {
        Self {
            aberto_em: caixa
                .aberto_em
                .with_timezone(&offset)
                .format("%d/%m/%Y %H:%M")
                .to_string(),
            valor_abertura: caixa.valor_abertura.display(),
            vendas_dinheiro: caixa.vendas_dinheiro.display(),
            suprimentos: caixa.total_por_tipo(MovimentacaoTipo::Suprimento).display(),
            sangrias: caixa.total_por_tipo(MovimentacaoTipo::Sangria).display(),
            saldo_esperado: caixa.saldo_esperado().display(),
            movimentacoes: caixa
                .movimentacoes
                .iter()
                .map(|m| MovimentacaoView::new(m, offset))
                .collect(),
        }
    }
}

/// Toast shown after closing, comparing counted and expected cash.
#[must_use]
pub fn resumo_fechamento(caixa: &Caixa) -> String {
    let esperado = caixa.saldo_esperado();
    match caixa.diferenca() {
        Some(diferenca) if diferenca.is_zero() => {
            format!("Caixa fechado. Saldo conferido: {}.", esperado.display())
        }
        Some(diferenca) => format!(
            "Caixa fechado. Esperado {}, diferença de {}.",
            esperado.display(),
            diferenca.display()
        ),
        None => "Caixa fechado.".to_string(),
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Cash register page template.
#[derive(Template, WebTemplate)]
#[template(path = "caixa/show.html")]
pub struct CaixaTemplate {
    pub page: PageContext,
    pub slug: String,
    pub caixa: Option<CaixaView>,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AbrirForm {
    #[serde(default)]
    pub valor_abertura: String,
}

#[derive(Debug, Deserialize)]
pub struct MovimentacaoForm {
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub valor: String,
    #[serde(default)]
    pub descricao: String,
}

impl MovimentacaoForm {
    /// Validate the movement typed by staff.
    ///
    /// # Errors
    ///
    /// Returns the message to show for an unknown kind or a non-positive value.
    pub fn parse(&self) -> std::result::Result<MovimentacaoInput, String> {
        let tipo = self
            .tipo
            .parse::<MovimentacaoTipo>()
            .map_err(|_| "Escolha suprimento ou sangria.".to_string())?;
        let valor = parse_price(&self.valor, "Valor")?;
        if valor.is_zero() {
            return Err("Informe um valor maior que zero.".to_string());
        }
        Ok(MovimentacaoInput {
            tipo,
            valor,
            descricao: optional(&self.descricao).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FecharForm {
    #[serde(default)]
    pub valor_fechamento: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the current cash session, or the opening form.
///
/// GET /{slug}/caixa
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn show(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<CaixaTemplate> {
    let caixa = state
        .api()
        .caixa_atual(staff.empresa_id, &staff.user.bearer())
        .await?;
    let offset = state.config().utc_offset;

    Ok(CaixaTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "caixa").await,
        slug: staff.slug.to_string(),
        caixa: caixa.filter(Caixa::aberto).map(|c| CaixaView::new(&c, offset)),
    })
}

/// Open a cash session.
///
/// POST /{slug}/caixa/abrir
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn abrir(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AbrirForm>,
) -> Result<Redirect> {
    let flash = match parse_price(&form.valor_abertura, "Valor de abertura") {
        Ok(valor) => {
            let result = state
                .api()
                .abrir_caixa(staff.empresa_id, valor, &staff.user.bearer())
                .await;
            match result {
                Ok(_) => {
                    tracing::info!(valor = %valor, "Cash session opened");
                    Flash::sucesso(format!("Caixa aberto com {}.", valor.display()))
                }
                Err(e) => Flash::erro(rejection_message(e.into())?),
            }
        }
        Err(message) => Flash::erro(message),
    };

    finish(&session, &staff, flash).await
}

/// Record a suprimento or sangria on the open session.
///
/// POST /{slug}/caixa/movimentacoes
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn movimentar(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<MovimentacaoForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return finish(&session, &staff, Flash::erro(message)).await,
    };
    let caixa = open_session(&state, &staff).await?;

    let flash = match state
        .api()
        .registrar_movimentacao(caixa.id, &input, &staff.user.bearer())
        .await
    {
        Ok(mov) => Flash::sucesso(format!(
            "{} de {} registrada.",
            MovimentacaoView::new(&mov, state.config().utc_offset).tipo,
            mov.valor.display()
        )),
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    finish(&session, &staff, flash).await
}

/// Close the open session with the counted amount.
///
/// POST /{slug}/caixa/fechar
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn fechar(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FecharForm>,
) -> Result<Redirect> {
    let contado = match parse_price(&form.valor_fechamento, "Valor contado") {
        Ok(contado) => contado,
        Err(message) => return finish(&session, &staff, Flash::erro(message)).await,
    };
    let caixa = open_session(&state, &staff).await?;

    let flash = match state
        .api()
        .fechar_caixa(caixa.id, contado, &staff.user.bearer())
        .await
    {
        Ok(fechado) => {
            tracing::info!(caixa_id = %fechado.id, contado = %contado, "Cash session closed");
            Flash::sucesso(resumo_fechamento(&fechado))
        }
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    finish(&session, &staff, flash).await
}

async fn open_session(state: &AppState, staff: &TenantStaff) -> Result<Caixa> {
    state
        .api()
        .caixa_atual(staff.empresa_id, &staff.user.bearer())
        .await?
        .filter(Caixa::aberto)
        .ok_or_else(|| AppError::BadRequest("Nenhum caixa aberto.".to_string()))
}

async fn finish(session: &Session, staff: &TenantStaff, flash: Flash) -> Result<Redirect> {
    push_flash(session, flash).await?;
    Ok(Redirect::to(&format!("/{}/caixa", staff.slug)))
}

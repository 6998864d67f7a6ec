//! Endpoint groups of the REST API, one `impl ApiClient` block per resource.

mod auth;
mod caixa;
mod cadastros;
mod empresas;
mod pedidos;
mod produtos;
mod public;
mod relatorios;

//! Backend records, deserialized from the REST API's JSON documents.

mod cadastros;
mod caixa;
mod empresa;
mod pedido;
mod produto;
mod relatorio;
mod sessao;

pub use cadastros::{
    Aviso, AvisoInput, Endereco, EnderecoInput, Funcionario, FuncionarioInput, buscar_bairro,
};
pub use caixa::{AbrirCaixa, Caixa, FecharCaixa, Movimentacao, MovimentacaoInput};
pub use empresa::{ConfiguracoesEmpresa, Empresa, EmpresaInput, NovoAdmin};
pub use pedido::{CourierLocation, NovoPedido, NovoPedidoItem, Pedido, PedidoItem, StatusUpdate};
pub use produto::{Adicional, AdicionalInput, Categoria, Produto, ProdutoInput, agrupar_por_categoria};
pub use relatorio::{ProdutoVendido, RelatorioFiltro, RelatorioVendas, VendasDia};
pub use sessao::{Sessao, Usuario};

pub mod direccion;
pub mod paquete;
pub mod pedido;
pub mod pedido_item;
pub mod usuario;

pub use direccion::Entity as Direccion;
pub use paquete::Entity as Paquete;
pub use pedido::Entity as Pedido;
pub use pedido_item::Entity as PedidoItem;
pub use usuario::Entity as Usuario;

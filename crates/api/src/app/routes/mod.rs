pub mod manutencao;
pub mod materiais;
pub mod system;

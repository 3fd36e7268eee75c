pub mod anadia;
pub mod codab;
pub mod floodscan;
pub mod hydrosheds;
pub mod worldpop;

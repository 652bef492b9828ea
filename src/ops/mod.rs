pub mod tile_ops;

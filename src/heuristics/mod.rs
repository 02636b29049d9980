pub mod random_order;

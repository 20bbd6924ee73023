mod bv;
mod node;
mod solver;

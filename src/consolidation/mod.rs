pub mod box_merger;

mod common;
mod elevator_cycle;
mod phase_publishing;
mod sim_timeline;
mod topic_boundary;

pub mod subscription_sweeps;

pub mod application {
    pub mod mqtt {
        pub mod client;
    }
}

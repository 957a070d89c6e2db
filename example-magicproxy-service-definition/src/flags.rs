use bitflags::bitflags;

bitflags! {
    /// Connection state of a [`Backend`](crate::Backend) session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BackendFlags: u32 {
        /// The client reported a supported version.
        const CLIENT_VERSION_OK = 1;
        /// The client presented a certificate during the handshake.
        const CLIENT_CERT_OK = 2;
        const LOGGED_IN = 4;
    }
}

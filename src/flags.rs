use std::path::PathBuf;

xflags::xflags! {
    cmd agora {
        /// Path to the TOML config file
        optional -c,--config config: PathBuf

        /// Run the delivery worker until interrupted
        default cmd serve {}

        /// Feed one JSON activity document through the inbox
        cmd receive {
            required file: PathBuf
            /// Host the document was authenticated as
            required --origin origin: String
        }

        /// Register a local actor so it can be followed
        cmd add-user {
            required uid: String
        }
    }
}

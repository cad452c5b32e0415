pub mod shared {
    pub mod constants;
    pub mod crop;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod nokhwa_source;
    }
}

pub mod detection {
    pub mod domain {
        pub mod presence_detector;
    }
    pub mod infrastructure;
}

pub mod transform {
    pub mod domain {
        pub mod image_transformer;
    }
    pub mod infrastructure {
        pub mod img2img_client;
    }
}

pub mod lighting {
    pub mod domain {
        pub mod lighting_controller;
    }
    pub mod infrastructure;
}

pub mod display {
    pub mod domain {
        pub mod display_surface;
        pub mod overlay;
    }
    pub mod infrastructure {
        pub mod window_surface;
    }
}

pub mod archive {
    pub mod domain {
        pub mod image_writer;
        pub mod snapshot_archive;
    }
    pub mod infrastructure {
        pub mod image_file_writer;
    }
}

pub mod mirror {
    pub mod mirror_config;
    pub mod mirror_loop;
    pub mod session_logger;
}

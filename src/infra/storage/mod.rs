pub mod local_photo_store;

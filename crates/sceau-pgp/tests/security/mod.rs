mod handle_release;
mod secret_masking;

pub fn print_success(message: &str) {
    println!("{}", message);
}

pub fn print_warning(message: &str) {
    println!("Warning: {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("Error: {}", message);
}

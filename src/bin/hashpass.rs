// Seed helper: hash a password for inserting the first admin row by hand.
use mindcare_server::auth::hash_password;

fn main() {
    let password = std::env::args().nth(1).expect("Usage: hashpass <password>");
    println!("{}", hash_password(&password).expect("argon2 hash failed"));
}

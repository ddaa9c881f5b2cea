pub mod ticket;
pub mod user;

pub use ticket::{NewTicket, Ticket, TicketView};
pub use user::{Role, User, UserView, UserWithTickets};

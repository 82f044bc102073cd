mod handler;
mod model;

pub use handler::{
    add_member,
    create_team,
    delete_team,
    get_team,
    leave_team,
    list_members,
    list_teams,
    remove_member,
    transfer_trainer,
    update_team,
};
pub use model::TeamDetail;
